//! In-memory model of the renderer's scene document: the named objects,
//! data blocks, materials and settings a terrain render touches.

use crate::formats::OutputFormat;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type Vec3 = [f64; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    Camera,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubdivisionType {
    CatmullClark,
    Simple,
}

/// A subdivision surface modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subsurf {
    pub subdivision_type: SubdivisionType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub kind: ObjectKind,
    pub location: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub modifiers: BTreeMap<String, Subsurf>,
    pub active_material: Option<String>,
    pub adaptive_subdivision: bool,
}

impl SceneObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            modifiers: BTreeMap::new(),
            active_material: None,
            adaptive_subdivision: false,
        }
    }

    fn placed(kind: ObjectKind, location: Vec3, rotation: Vec3) -> Self {
        Self {
            location,
            rotation,
            ..Self::new(kind)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub ortho_scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Point,
    Sun,
    Spot,
    Area,
}

impl LightType {
    pub fn identifier(&self) -> &'static str {
        match self {
            LightType::Point => "POINT",
            LightType::Sun => "SUN",
            LightType::Spot => "SPOT",
            LightType::Area => "AREA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    /// Watts, or irradiance in W/m² for suns.
    pub energy: f64,
    /// Angular diameter of a sun, in radians.
    pub angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplacementMethod {
    Bump,
    Displacement,
    Both,
}

impl DisplacementMethod {
    pub fn identifier(&self) -> &'static str {
        match self {
            DisplacementMethod::Bump => "BUMP",
            DisplacementMethod::Displacement => "DISPLACEMENT",
            DisplacementMethod::Both => "BOTH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    PrincipledBsdf,
    MaterialOutput,
    ImageTexture,
    Displacement,
    ColorRamp,
}

impl NodeKind {
    /// The node type name the renderer creates nodes by.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::PrincipledBsdf => "ShaderNodeBsdfPrincipled",
            NodeKind::MaterialOutput => "ShaderNodeOutputMaterial",
            NodeKind::ImageTexture => "ShaderNodeTexImage",
            NodeKind::Displacement => "ShaderNodeDisplacement",
            NodeKind::ColorRamp => "ShaderNodeValToRGB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SocketValue {
    Float(f64),
    Color([f64; 4]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureExtension {
    Repeat,
    Extend,
    Clip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureInterpolation {
    Linear,
    Closest,
    Cubic,
    Smart,
}

/// Image binding of an image texture node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub image: String,
    pub extension: TextureExtension,
    pub interpolation: TextureInterpolation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub kind: NodeKind,
    /// Values of unlinked input sockets that differ from the node's
    /// defaults.
    pub inputs: BTreeMap<String, SocketValue>,
    pub texture: Option<TextureBinding>,
}

impl ShaderNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: BTreeMap::new(),
            texture: None,
        }
    }
}

/// The output socket feeding an input socket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Socket {
    pub node: String,
    pub socket: String,
}

impl Socket {
    pub fn new(node: &str, socket: &str) -> Self {
        Self {
            node: node.to_string(),
            socket: socket.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub displacement_method: DisplacementMethod,
    pub nodes: BTreeMap<String, ShaderNode>,
    /// Links keyed by their destination; an input takes one link at most.
    pub links: BTreeMap<Socket, Socket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub colorspace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEngine {
    Eevee,
    Cycles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    Supported,
    Experimental,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub engine: RenderEngine,
    pub feature_set: FeatureSet,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub resolution_percentage: u32,
    pub samples: u32,
    pub filepath: PathBuf,
    pub file_format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    pub objects: BTreeMap<String, SceneObject>,
    pub cameras: BTreeMap<String, Camera>,
    pub lights: BTreeMap<String, Light>,
    pub materials: BTreeMap<String, Material>,
    pub images: BTreeMap<String, Image>,
    pub render: RenderSettings,
}

impl SceneDocument {
    /// A document with nothing in it.
    pub fn empty() -> Self {
        Self {
            objects: BTreeMap::new(),
            cameras: BTreeMap::new(),
            lights: BTreeMap::new(),
            materials: BTreeMap::new(),
            images: BTreeMap::new(),
            render: RenderSettings {
                engine: RenderEngine::Eevee,
                feature_set: FeatureSet::Supported,
                resolution_x: 1920,
                resolution_y: 1080,
                resolution_percentage: 100,
                samples: 4096,
                filepath: PathBuf::from("/tmp/"),
                file_format: OutputFormat::Png,
            },
        }
    }

    /// The document the renderer starts from without user preferences: a
    /// cube with the default material, a perspective camera and a point
    /// light.
    pub fn factory_startup() -> Self {
        let mut document = Self::empty();

        let mut cube = SceneObject::new(ObjectKind::Mesh);
        cube.active_material = Some("Material".to_string());
        document.objects.insert("Cube".to_string(), cube);

        document.objects.insert(
            "Camera".to_string(),
            SceneObject::placed(
                ObjectKind::Camera,
                [7.3589, -6.9258, 4.9583],
                [1.1093, 0.0, 0.8149],
            ),
        );
        document.cameras.insert(
            "Camera".to_string(),
            Camera {
                projection: Projection::Perspective,
                ortho_scale: 7.3142,
            },
        );

        document.objects.insert(
            "Light".to_string(),
            SceneObject::placed(
                ObjectKind::Light,
                [4.0762, 1.0055, 5.9039],
                [0.6503, 0.0552, 1.8663],
            ),
        );
        document.lights.insert(
            "Light".to_string(),
            Light {
                light_type: LightType::Point,
                energy: 1000.0,
                angle: 0.00918,
            },
        );

        let mut bsdf = ShaderNode::new(NodeKind::PrincipledBsdf);
        bsdf.inputs.insert(
            "Base Color".to_string(),
            SocketValue::Color([0.8, 0.8, 0.8, 1.0]),
        );
        bsdf.inputs
            .insert("Roughness".to_string(), SocketValue::Float(0.5));
        bsdf.inputs
            .insert("Specular".to_string(), SocketValue::Float(0.5));

        let mut nodes = BTreeMap::new();
        nodes.insert("Principled BSDF".to_string(), bsdf);
        nodes.insert(
            "Material Output".to_string(),
            ShaderNode::new(NodeKind::MaterialOutput),
        );
        let mut links = BTreeMap::new();
        links.insert(
            Socket::new("Material Output", "Surface"),
            Socket::new("Principled BSDF", "BSDF"),
        );
        document.materials.insert(
            "Material".to_string(),
            Material {
                displacement_method: DisplacementMethod::Bump,
                nodes,
                links,
            },
        );

        document
    }

    /// Adds an image, or returns the name of the one already loaded from
    /// the same path. New images are named after their file, with a numeric
    /// suffix when the name is taken.
    pub fn load_image(&mut self, path: &Path, width: u32, height: u32) -> String {
        if let Some((name, _)) =
            self.images.iter().find(|(_, image)| image.path == path)
        {
            return name.clone();
        }

        let base = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Image".to_string());
        let mut name = base.clone();
        let mut suffix = 1;
        while self.images.contains_key(&name) {
            name = format!("{}.{:03}", base, suffix);
            suffix += 1;
        }

        self.images.insert(
            name.clone(),
            Image {
                path: path.to_path_buf(),
                width,
                height,
                colorspace: "sRGB".to_string(),
            },
        );
        name
    }
}
