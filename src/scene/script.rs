//! Turns a configured [`SceneDocument`] into a Blender Python script that
//! brings a factory startup session into the same state and renders it.

use super::document::{
    FeatureSet, ObjectKind, Projection, RenderEngine, SceneDocument,
    SocketValue, SubdivisionType, TextureExtension, TextureInterpolation,
    Vec3,
};
use std::fmt::Write;
use std::path::Path;

const PRELUDE: &str = r#"import bpy

scene = bpy.context.scene
images = {}


def remove_object(name):
    obj = bpy.data.objects.get(name)
    if obj is not None:
        bpy.data.objects.remove(obj, do_unlink=True)


def get_node(tree, name, type_name):
    node = tree.nodes.get(name)
    if node is None:
        node = tree.nodes.new(type_name)
        node.name = name
    return node


def set_input(node, names, value):
    for name in names:
        if name in node.inputs:
            node.inputs[name].default_value = value
            return


def set_colorspace(image, names):
    for name in names:
        try:
            image.colorspace_settings.name = name
            return
        except TypeError:
            pass


def set_displacement_method(material, method):
    try:
        material.displacement_method = method
    except AttributeError:
        material.cycles.displacement_method = method


def enable_adaptive_subdivision(obj):
    try:
        obj.cycles.use_adaptive_subdivision = True
    except AttributeError:
        pass
"#;

/// Python string literal for `text`. JSON string escapes are valid Python.
fn py_str(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn py_path(path: &Path) -> String {
    py_str(&path.to_string_lossy())
}

fn py_vec(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
    format!("({})", items.join(", "))
}

fn py_vec3(values: &Vec3) -> String {
    py_vec(values)
}

/// Socket names to try for an input, newest renderer version last.
fn input_aliases(name: &str) -> Vec<&str> {
    match name {
        "Specular" => vec!["Specular", "Specular IOR Level"],
        other => vec![other],
    }
}

/// Builds the script. The render is written to `write_path`, which may
/// differ from the document's output path when the output is staged.
pub fn render_script(document: &SceneDocument, write_path: &Path) -> String {
    let mut script = String::from(PRELUDE);
    let factory = SceneDocument::factory_startup();

    // writing to a String cannot fail
    let _ = write_objects(&mut script, document, &factory);
    let _ = write_data_blocks(&mut script, document);
    let _ = write_images(&mut script, document);
    let _ = write_materials(&mut script, document);
    let _ = write_render(&mut script, document, write_path);
    script
}

fn write_objects(
    script: &mut String,
    document: &SceneDocument,
    factory: &SceneDocument,
) -> std::fmt::Result {
    writeln!(script, "\n# objects")?;
    for name in factory.objects.keys() {
        if !document.objects.contains_key(name) {
            writeln!(script, "remove_object({})", py_str(name))?;
        }
    }

    for (name, object) in &document.objects {
        if !factory.objects.contains_key(name) {
            if object.kind != ObjectKind::Mesh {
                log::warn!("Cannot create {:?} object '{}'", object.kind, name);
                continue;
            }
            writeln!(script, "remove_object({})", py_str(name))?;
            writeln!(script, "bpy.ops.mesh.primitive_plane_add()")?;
            writeln!(script, "bpy.context.active_object.name = {}", py_str(name))?;
        }

        writeln!(script, "obj = bpy.data.objects[{}]", py_str(name))?;
        writeln!(script, "obj.location = {}", py_vec3(&object.location))?;
        writeln!(script, "obj.rotation_euler = {}", py_vec3(&object.rotation))?;
        writeln!(script, "obj.scale = {}", py_vec3(&object.scale))?;

        for (modifier_name, modifier) in &object.modifiers {
            let subdivision = match modifier.subdivision_type {
                SubdivisionType::Simple => "SIMPLE",
                SubdivisionType::CatmullClark => "CATMULL_CLARK",
            };
            writeln!(
                script,
                "modifier = obj.modifiers.get({name}) or obj.modifiers.new(name={name}, type=\"SUBSURF\")",
                name = py_str(modifier_name)
            )?;
            writeln!(script, "modifier.subdivision_type = \"{}\"", subdivision)?;
        }
        if object.adaptive_subdivision {
            writeln!(script, "enable_adaptive_subdivision(obj)")?;
        }
        if let Some(material) = &object.active_material {
            writeln!(
                script,
                "obj.active_material = bpy.data.materials[{}]",
                py_str(material)
            )?;
        }
    }
    Ok(())
}

fn write_data_blocks(
    script: &mut String,
    document: &SceneDocument,
) -> std::fmt::Result {
    writeln!(script, "\n# cameras and lights")?;
    for (name, camera) in &document.cameras {
        let projection = match camera.projection {
            Projection::Perspective => "PERSP",
            Projection::Orthographic => "ORTHO",
        };
        writeln!(script, "bpy.data.cameras[{}].type = \"{}\"", py_str(name), projection)?;
        writeln!(
            script,
            "bpy.data.cameras[{}].ortho_scale = {:?}",
            py_str(name),
            camera.ortho_scale
        )?;
    }

    // the light is looked up again after each change since changing its
    // type replaces the Python object
    for (name, light) in &document.lights {
        writeln!(
            script,
            "bpy.data.lights[{}].type = \"{}\"",
            py_str(name),
            light.light_type.identifier()
        )?;
        writeln!(script, "bpy.data.lights[{}].energy = {:?}", py_str(name), light.energy)?;
        writeln!(script, "bpy.data.lights[{}].angle = {:?}", py_str(name), light.angle)?;
    }
    Ok(())
}

fn write_images(script: &mut String, document: &SceneDocument) -> std::fmt::Result {
    writeln!(script, "\n# images")?;
    for (name, image) in &document.images {
        writeln!(
            script,
            "images[{}] = bpy.data.images.load({}, check_existing=True)",
            py_str(name),
            py_path(&image.path)
        )?;
        let mut colorspaces = vec![py_str(&image.colorspace)];
        if image.colorspace == "Linear" {
            colorspaces.push(py_str("Linear Rec.709"));
        }
        writeln!(
            script,
            "set_colorspace(images[{}], [{}])",
            py_str(name),
            colorspaces.join(", ")
        )?;
    }
    Ok(())
}

fn write_materials(
    script: &mut String,
    document: &SceneDocument,
) -> std::fmt::Result {
    for (name, material) in &document.materials {
        writeln!(script, "\n# material {}", name)?;
        writeln!(script, "material = bpy.data.materials[{}]", py_str(name))?;
        writeln!(script, "material.use_nodes = True")?;
        writeln!(
            script,
            "set_displacement_method(material, \"{}\")",
            material.displacement_method.identifier()
        )?;
        writeln!(script, "tree = material.node_tree")?;

        for (node_name, node) in &material.nodes {
            writeln!(
                script,
                "node = get_node(tree, {}, \"{}\")",
                py_str(node_name),
                node.kind.type_name()
            )?;
            for (input, value) in &node.inputs {
                let value = match value {
                    SocketValue::Float(v) => format!("{:?}", v),
                    SocketValue::Color(c) => py_vec(c),
                };
                let aliases: Vec<String> =
                    input_aliases(input).into_iter().map(py_str).collect();
                writeln!(
                    script,
                    "set_input(node, [{}], {})",
                    aliases.join(", "),
                    value
                )?;
            }
            if let Some(binding) = &node.texture {
                let extension = match binding.extension {
                    TextureExtension::Repeat => "REPEAT",
                    TextureExtension::Extend => "EXTEND",
                    TextureExtension::Clip => "CLIP",
                };
                let interpolation = match binding.interpolation {
                    TextureInterpolation::Linear => "Linear",
                    TextureInterpolation::Closest => "Closest",
                    TextureInterpolation::Cubic => "Cubic",
                    TextureInterpolation::Smart => "Smart",
                };
                writeln!(script, "node.image = images[{}]", py_str(&binding.image))?;
                writeln!(script, "node.extension = \"{}\"", extension)?;
                writeln!(script, "node.interpolation = \"{}\"", interpolation)?;
            }
        }

        for (to, from) in &material.links {
            writeln!(
                script,
                "tree.links.new(tree.nodes[{}].outputs[{}], tree.nodes[{}].inputs[{}])",
                py_str(&from.node),
                py_str(&from.socket),
                py_str(&to.node),
                py_str(&to.socket)
            )?;
        }
    }
    Ok(())
}

fn write_render(
    script: &mut String,
    document: &SceneDocument,
    write_path: &Path,
) -> std::fmt::Result {
    let render = &document.render;
    let engine = match render.engine {
        RenderEngine::Eevee => "BLENDER_EEVEE",
        RenderEngine::Cycles => "CYCLES",
    };
    let feature_set = match render.feature_set {
        FeatureSet::Supported => "SUPPORTED",
        FeatureSet::Experimental => "EXPERIMENTAL",
    };

    writeln!(script, "\n# render")?;
    writeln!(script, "scene.render.engine = \"{}\"", engine)?;
    writeln!(script, "scene.cycles.feature_set = \"{}\"", feature_set)?;
    writeln!(script, "scene.render.resolution_x = {}", render.resolution_x)?;
    writeln!(script, "scene.render.resolution_y = {}", render.resolution_y)?;
    writeln!(
        script,
        "scene.render.resolution_percentage = {}",
        render.resolution_percentage
    )?;
    writeln!(script, "scene.cycles.samples = {}", render.samples)?;
    writeln!(script, "scene.render.filepath = {}", py_path(write_path))?;
    writeln!(script, "scene.render.use_file_extension = False")?;
    writeln!(
        script,
        "scene.render.image_settings.file_format = \"{}\"",
        render.file_format.blender_name()
    )?;
    writeln!(script, "bpy.ops.render.render(write_still=True)")
}
