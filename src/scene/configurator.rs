use super::document::{
    DisplacementMethod, FeatureSet, LightType, NodeKind, ObjectKind,
    Projection, RenderEngine, SceneDocument, SceneObject, ShaderNode, Socket,
    SocketValue, Subsurf, SubdivisionType, TextureBinding, TextureExtension,
    TextureInterpolation,
};
use super::params::RenderParameters;
use crate::errors::HillmapError;
use crate::formats::OutputFormat;
use crate::trig::{scene_deg_to_rad, SUN_AZIMUTH};
use crate::Result;
use std::path::{Path, PathBuf};

pub const PLANE: &str = "Plane";
pub const CUBE: &str = "Cube";
pub const CAMERA: &str = "Camera";
pub const LIGHT: &str = "Light";
pub const MATERIAL: &str = "Material";
pub const SUBDIVISION: &str = "Subdivision";

pub const PRINCIPLED_BSDF: &str = "Principled BSDF";
pub const MATERIAL_OUTPUT: &str = "Material Output";
pub const IMAGE_TEXTURE: &str = "Image Texture";
pub const DISPLACEMENT: &str = "Displacement";
pub const COLOR_RAMP: &str = "ColorRamp";

/// Image pixels per scene unit of plane size.
const PIXELS_PER_UNIT: f64 = 1000.0;
const CAMERA_HEIGHT: f64 = 3.0;
const SUN_ENERGY: f64 = 5.0;
const BASE_COLOR: [f64; 4] = [0.6, 0.6, 0.6, 1.0];

/// The elevation image a scene is built around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Sets up `document` to render `image` as a displaced, sun lit plane seen
/// from straight above, writing the render to `output`.
///
/// The steps run in a fixed order: geometry, camera, light, material and
/// render settings. Running them again on the resulting document changes
/// nothing.
///
/// # Arguments
///
/// * `document` - The scene to change. It must hold the `Camera` and
///   `Light` objects and the `Material` material with its
///   `Principled BSDF` and `Material Output` nodes.
/// * `parameters` - Render controls.
/// * `image` - The elevation image.
/// * `output` - Where the render is written; its extension selects the
///   file format.
pub fn configure(
    document: &mut SceneDocument,
    parameters: &RenderParameters,
    image: &DemImage,
    output: &Path,
) -> Result<()> {
    let (plane_x, plane_y) = plane_size(image);

    set_up_geometry(document, plane_x, plane_y);
    set_up_camera(document, plane_x, plane_y)?;
    set_up_light(document, parameters)?;
    set_up_material(document, parameters, image)?;
    set_up_render(document, parameters, image, output);

    log::debug!(
        "Scene set up for a {}x{} image, plane {}x{}",
        image.width,
        image.height,
        plane_x,
        plane_y
    );
    Ok(())
}

fn plane_size(image: &DemImage) -> (f64, f64) {
    (
        image.width as f64 / PIXELS_PER_UNIT,
        image.height as f64 / PIXELS_PER_UNIT,
    )
}

fn missing(name: &str) -> HillmapError {
    HillmapError::HostObjectMissing(name.to_string())
}

fn set_up_geometry(document: &mut SceneDocument, plane_x: f64, plane_y: f64) {
    document.objects.remove(CUBE);
    document.objects.remove(PLANE);

    let mut plane = SceneObject::new(ObjectKind::Mesh);
    plane.scale = [plane_x, plane_y, 1.0];
    plane
        .modifiers
        .entry(SUBDIVISION.to_string())
        .or_insert(Subsurf {
            subdivision_type: SubdivisionType::Simple,
        });
    plane.adaptive_subdivision = true;
    document.objects.insert(PLANE.to_string(), plane);
}

fn set_up_camera(
    document: &mut SceneDocument,
    plane_x: f64,
    plane_y: f64,
) -> Result<()> {
    let object = document.objects.get_mut(CAMERA).ok_or_else(|| missing(CAMERA))?;
    object.location = [0.0, 0.0, CAMERA_HEIGHT];
    object.rotation = [0.0, 0.0, 0.0];

    let camera = document.cameras.get_mut(CAMERA).ok_or_else(|| missing(CAMERA))?;
    camera.projection = Projection::Orthographic;
    // the plane spans [-scale, scale] on each axis
    camera.ortho_scale = 2.0 * plane_x.max(plane_y);
    Ok(())
}

fn set_up_light(
    document: &mut SceneDocument,
    parameters: &RenderParameters,
) -> Result<()> {
    let light = document.lights.get_mut(LIGHT).ok_or_else(|| missing(LIGHT))?;
    light.light_type = LightType::Sun;
    light.energy = SUN_ENERGY;
    light.angle = scene_deg_to_rad(parameters.clamped_softness() as f64);

    let object = document.objects.get_mut(LIGHT).ok_or_else(|| missing(LIGHT))?;
    object.rotation = [
        0.0,
        scene_deg_to_rad(parameters.sun_angle as f64),
        SUN_AZIMUTH,
    ];
    Ok(())
}

fn set_up_material(
    document: &mut SceneDocument,
    parameters: &RenderParameters,
    image: &DemImage,
) -> Result<()> {
    if !document.materials.contains_key(MATERIAL) {
        return Err(missing(MATERIAL));
    }

    let image_name = document.load_image(&image.path, image.width, image.height);
    if let Some(loaded) = document.images.get_mut(&image_name) {
        loaded.colorspace = "Linear".to_string();
    }

    let plane = document.objects.get_mut(PLANE).ok_or_else(|| missing(PLANE))?;
    plane.active_material = Some(MATERIAL.to_string());

    let material = document
        .materials
        .get_mut(MATERIAL)
        .ok_or_else(|| missing(MATERIAL))?;
    material.displacement_method = DisplacementMethod::Displacement;

    let bsdf = material
        .nodes
        .get_mut(PRINCIPLED_BSDF)
        .ok_or_else(|| missing(PRINCIPLED_BSDF))?;
    bsdf.inputs
        .insert("Base Color".to_string(), SocketValue::Color(BASE_COLOR));
    bsdf.inputs
        .insert("Roughness".to_string(), SocketValue::Float(1.0));
    bsdf.inputs
        .insert("Specular".to_string(), SocketValue::Float(0.0));

    if !material.nodes.contains_key(MATERIAL_OUTPUT) {
        return Err(missing(MATERIAL_OUTPUT));
    }

    let texture = material
        .nodes
        .entry(IMAGE_TEXTURE.to_string())
        .or_insert_with(|| ShaderNode::new(NodeKind::ImageTexture));
    texture.texture = Some(TextureBinding {
        image: image_name,
        extension: TextureExtension::Extend,
        interpolation: TextureInterpolation::Smart,
    });

    let displacement = material
        .nodes
        .entry(DISPLACEMENT.to_string())
        .or_insert_with(|| ShaderNode::new(NodeKind::Displacement));
    displacement.inputs.insert(
        "Scale".to_string(),
        SocketValue::Float(parameters.exaggeration),
    );

    material
        .nodes
        .entry(COLOR_RAMP.to_string())
        .or_insert_with(|| ShaderNode::new(NodeKind::ColorRamp));

    material.links.insert(
        Socket::new(DISPLACEMENT, "Height"),
        Socket::new(IMAGE_TEXTURE, "Color"),
    );
    material.links.insert(
        Socket::new(MATERIAL_OUTPUT, "Displacement"),
        Socket::new(DISPLACEMENT, "Displacement"),
    );
    Ok(())
}

fn set_up_render(
    document: &mut SceneDocument,
    parameters: &RenderParameters,
    image: &DemImage,
    output: &Path,
) {
    let render = &mut document.render;
    render.engine = RenderEngine::Cycles;
    render.feature_set = FeatureSet::Experimental;
    render.resolution_x = image.width;
    render.resolution_y = image.height;
    render.resolution_percentage = parameters.resolution_scale;
    render.samples = parameters.samples;
    render.filepath = output.to_path_buf();
    render.file_format = OutputFormat::from_path(output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn dem_image(width: u32, height: u32) -> DemImage {
        DemImage {
            path: PathBuf::from("/data/dem.png"),
            width,
            height,
        }
    }

    fn configured(
        parameters: &RenderParameters,
        image: &DemImage,
        output: &str,
    ) -> SceneDocument {
        let mut document = SceneDocument::factory_startup();
        configure(&mut document, parameters, image, Path::new(output)).unwrap();
        document
    }

    #[test]
    fn plane_replaces_cube() {
        let document =
            configured(&RenderParameters::default(), &dem_image(4000, 2000), "/out/r.png");

        assert!(!document.objects.contains_key(CUBE));
        let plane = &document.objects[PLANE];
        assert_eq!(plane.scale, [4.0, 2.0, 1.0]);
        assert_eq!(
            plane.modifiers[SUBDIVISION].subdivision_type,
            SubdivisionType::Simple
        );
        assert!(plane.adaptive_subdivision);
        assert_eq!(plane.active_material.as_deref(), Some(MATERIAL));
    }

    #[test]
    fn camera_looks_down_on_the_plane() {
        let document =
            configured(&RenderParameters::default(), &dem_image(1000, 3000), "/out/r.png");

        let camera = &document.cameras[CAMERA];
        assert_eq!(camera.projection, Projection::Orthographic);
        assert_abs_diff_eq!(camera.ortho_scale, 6.0);
        assert_eq!(document.objects[CAMERA].location, [0.0, 0.0, 3.0]);
        assert_eq!(document.objects[CAMERA].rotation, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn sun_light() {
        let parameters = RenderParameters::new(1.0, 90, 45, 100, 20).unwrap();
        let document = configured(&parameters, &dem_image(100, 100), "/out/r.png");

        let light = &document.lights[LIGHT];
        assert_eq!(light.light_type, LightType::Sun);
        assert_eq!(light.energy, 5.0);
        assert_eq!(light.angle, 90.0 / 57.295);
        assert_abs_diff_eq!(light.angle, 1.5708, epsilon = 1e-4);
        assert_eq!(
            document.objects[LIGHT].rotation,
            [0.0, 45.0 / 57.295, 2.35619]
        );
    }

    #[test]
    fn softness_is_clamped_in_the_scene() {
        let parameters = RenderParameters::new(1.0, 400, 45, 100, 20).unwrap();
        let document = configured(&parameters, &dem_image(100, 100), "/out/r.png");
        assert_eq!(document.lights[LIGHT].angle, 180.0 / 57.295);
    }

    #[test]
    fn displacement_material() {
        let parameters = RenderParameters::new(2.5, 90, 45, 100, 20).unwrap();
        let document = configured(&parameters, &dem_image(100, 100), "/out/r.png");
        let material = &document.materials[MATERIAL];

        assert_eq!(
            material.displacement_method,
            DisplacementMethod::Displacement
        );
        assert_eq!(
            material.nodes[DISPLACEMENT].inputs["Scale"],
            SocketValue::Float(2.5)
        );
        assert_eq!(
            material.nodes[PRINCIPLED_BSDF].inputs["Base Color"],
            SocketValue::Color([0.6, 0.6, 0.6, 1.0])
        );
        assert!(material.nodes.contains_key(COLOR_RAMP));
        assert_eq!(
            material.links[&Socket::new(DISPLACEMENT, "Height")],
            Socket::new(IMAGE_TEXTURE, "Color")
        );
        assert_eq!(
            material.links[&Socket::new(MATERIAL_OUTPUT, "Displacement")],
            Socket::new(DISPLACEMENT, "Displacement")
        );

        let binding = material.nodes[IMAGE_TEXTURE].texture.as_ref().unwrap();
        assert_eq!(binding.extension, TextureExtension::Extend);
        assert_eq!(binding.interpolation, TextureInterpolation::Smart);
        assert_eq!(document.images[&binding.image].colorspace, "Linear");
    }

    #[test]
    fn render_settings() {
        let parameters = RenderParameters::new(1.0, 90, 45, 75, 12).unwrap();
        let document =
            configured(&parameters, &dem_image(640, 480), "/out/render.TIFF");
        let render = &document.render;

        assert_eq!(render.engine, RenderEngine::Cycles);
        assert_eq!(render.feature_set, FeatureSet::Experimental);
        assert_eq!((render.resolution_x, render.resolution_y), (640, 480));
        assert_eq!(render.resolution_percentage, 75);
        assert_eq!(render.samples, 12);
        assert_eq!(render.filepath, PathBuf::from("/out/render.TIFF"));
        assert_eq!(render.file_format, OutputFormat::Tiff);
    }

    #[test]
    fn missing_camera() {
        let mut document = SceneDocument::factory_startup();
        document.objects.remove(CAMERA);
        let result = configure(
            &mut document,
            &RenderParameters::default(),
            &dem_image(10, 10),
            Path::new("/out/r.png"),
        );
        assert!(matches!(
            result,
            Err(HillmapError::HostObjectMissing(name)) if name == CAMERA
        ));
    }

    #[test]
    fn missing_material_output() {
        let mut document = SceneDocument::factory_startup();
        document
            .materials
            .get_mut(MATERIAL)
            .unwrap()
            .nodes
            .remove(MATERIAL_OUTPUT);
        let result = configure(
            &mut document,
            &RenderParameters::default(),
            &dem_image(10, 10),
            Path::new("/out/r.png"),
        );
        assert!(matches!(
            result,
            Err(HillmapError::HostObjectMissing(name)) if name == MATERIAL_OUTPUT
        ));
    }

    proptest! {
        /// Configuring twice leaves the document as configuring once did.
        #[test]
        fn configure_is_idempotent(
            width in 1u32..10_000,
            height in 1u32..10_000,
            exaggeration in 0.0f64..10.0,
            softness in -360i32..360,
            sun_angle in -90i32..90,
        ) {
            let parameters =
                RenderParameters::new(exaggeration, softness, sun_angle, 50, 5).unwrap();
            let image = dem_image(width, height);
            let output = Path::new("/out/render.png");

            let mut once = SceneDocument::factory_startup();
            configure(&mut once, &parameters, &image, output).unwrap();
            let mut twice = once.clone();
            configure(&mut twice, &parameters, &image, output).unwrap();

            prop_assert_eq!(once, twice);
        }
    }
}
