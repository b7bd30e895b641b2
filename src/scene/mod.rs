//! The renderer's scene model, the steps that set it up for a terrain
//! render and the hosts that render it.

pub mod configurator;
pub mod document;
pub mod host;
pub mod params;
pub mod script;

pub use configurator::{configure, DemImage};
pub use document::SceneDocument;
pub use host::{BlenderHost, RenderHost};
pub use params::RenderParameters;
pub use script::render_script;
