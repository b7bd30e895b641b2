use crate::errors::HillmapError;
use crate::scene::{
    configure, BlenderHost, DemImage, RenderHost, RenderParameters,
    SceneDocument,
};
use crate::validate::{Checks, PathRole};
use crate::Result;
use std::path::{Path, PathBuf};

/// A checked request to render an elevation image as a shaded relief.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub image: DemImage,
    pub output: PathBuf,
    pub parameters: RenderParameters,
}

impl RenderRequest {
    /// Validates the paths and reads the dimensions of the elevation image.
    ///
    /// # Arguments
    ///
    /// * `dem_image` - An 8 or 16 bit image of the elevations, such as the
    ///   output of `to_image` or `downsample`.
    /// * `output` - Where the render is written. Its extension selects the
    ///   file format.
    /// * `parameters` - Render controls.
    pub fn new(
        dem_image: &Path,
        output: &Path,
        parameters: RenderParameters,
    ) -> Result<RenderRequest> {
        Checks::new()
            .input("dem_image", dem_image, PathRole::Render)
            .output("output", output, PathRole::Render)
            .run()?;

        let (width, height) = image::image_dimensions(dem_image).map_err(|e| {
            HillmapError::ImageLoad {
                path: dem_image.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        Ok(RenderRequest {
            image: DemImage {
                path: dem_image.to_path_buf(),
                width,
                height,
            },
            output: output.to_path_buf(),
            parameters,
        })
    }
}

/// Configures a factory startup scene for `request` and has `host` render
/// it. Returns the configured scene.
pub fn render_with(
    host: &dyn RenderHost,
    request: &RenderRequest,
) -> Result<SceneDocument> {
    let mut document = SceneDocument::factory_startup();
    configure(
        &mut document,
        &request.parameters,
        &request.image,
        &request.output,
    )?;

    log::info!(
        "Rendering {} ({}x{} at {}%, {} samples)",
        request.image.path.display(),
        request.image.width,
        request.image.height,
        request.parameters.resolution_scale,
        request.parameters.samples
    );
    host.render(&document, &request.output)?;
    Ok(document)
}

/// Renders `dem_image` to `output` with the Blender executable at
/// `blender`.
pub fn render(
    blender: &Path,
    dem_image: &Path,
    output: &Path,
    parameters: RenderParameters,
) -> Result<()> {
    let request = RenderRequest::new(dem_image, output, parameters)?;
    let host = BlenderHost::new(blender)?;
    render_with(&host, &request)?;
    Ok(())
}
