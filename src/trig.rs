/// Degrees per radian used for every angle handed to the renderer. It is
/// not 180/π: rendered light angles depend on this exact value.
pub const SCENE_DEGREES_PER_RADIAN: f64 = 57.295;

/// Azimuth of the sun (135°) in radians.
pub const SUN_AZIMUTH: f64 = 2.35619;

pub fn scene_deg_to_rad(deg: f64) -> f64 {
    deg / SCENE_DEGREES_PER_RADIAN
}
