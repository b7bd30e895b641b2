use crate::errors::ValidationError;
use crate::validate::Checks;

pub const MAX_SHADOW_SOFTNESS: i32 = 180;

/// Controls of a terrain render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParameters {
    /// Displacement scale applied to the elevation image.
    pub exaggeration: f64,
    /// Angular size of the sun in degrees; softer shadows for larger
    /// values. Clamped to [0, 180] when applied.
    pub shadow_softness: i32,
    /// Elevation of the sun in degrees.
    pub sun_angle: i32,
    /// Render size as a percentage of the elevation image's size.
    pub resolution_scale: u32,
    /// Path tracing samples per pixel.
    pub samples: u32,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            exaggeration: 0.5,
            shadow_softness: 90,
            sun_angle: 45,
            resolution_scale: 50,
            samples: 5,
        }
    }
}

impl RenderParameters {
    pub fn new(
        exaggeration: f64,
        shadow_softness: i32,
        sun_angle: i32,
        resolution_scale: u32,
        samples: u32,
    ) -> Result<Self, ValidationError> {
        Checks::new()
            .at_least("exaggeration", exaggeration, 0.0)
            .at_least("resolution_scale", resolution_scale as f64, 1.0)
            .at_least("samples", samples as f64, 1.0)
            .run()?;

        Ok(Self {
            exaggeration,
            shadow_softness,
            sun_angle,
            resolution_scale,
            samples,
        })
    }

    pub fn clamped_softness(&self) -> i32 {
        self.shadow_softness.clamp(0, MAX_SHADOW_SOFTNESS)
    }
}
