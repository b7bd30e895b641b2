use crate::errors::ValidationError;
use image::Rgb;
use std::fmt;
use std::str::FromStr;

/// A colour stop: position in [0, 1] mapped to an RGB colour.
#[derive(Debug, Clone, Copy)]
struct ColorStop {
    t: f64,
    color: [u8; 3],
}

const fn stop(t: f64, r: u8, g: u8, b: u8) -> ColorStop {
    ColorStop {
        t,
        color: [r, g, b],
    }
}

const TERRAIN_STOPS: &[ColorStop] = &[
    stop(0.0, 51, 51, 153),
    stop(0.15, 0, 153, 255),
    stop(0.25, 0, 204, 102),
    stop(0.5, 255, 255, 153),
    stop(0.75, 128, 92, 84),
    stop(1.0, 255, 255, 255),
];

const VIRIDIS_STOPS: &[ColorStop] = &[
    stop(0.0, 68, 1, 84),
    stop(0.125, 71, 44, 122),
    stop(0.25, 59, 81, 139),
    stop(0.375, 44, 113, 142),
    stop(0.5, 33, 144, 141),
    stop(0.625, 39, 173, 129),
    stop(0.75, 92, 200, 99),
    stop(0.875, 170, 220, 50),
    stop(1.0, 253, 231, 37),
];

/// Colour maps available for plots, named as in matplotlib.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Black -> White
    #[default]
    GreysR,
    /// White -> Black
    Greys,
    /// Blue -> Green -> Yellow -> Brown -> White
    Terrain,
    /// Purple -> Teal -> Yellow
    Viridis,
}

impl Colormap {
    pub const ALL: [Colormap; 4] = [
        Colormap::GreysR,
        Colormap::Greys,
        Colormap::Terrain,
        Colormap::Viridis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::GreysR => "Greys_r",
            Colormap::Greys => "Greys",
            Colormap::Terrain => "terrain",
            Colormap::Viridis => "viridis",
        }
    }

    /// Colour at normalised position `t`, clamped to [0, 1].
    pub fn color(&self, t: f64) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::GreysR => gray(t),
            Colormap::Greys => gray(1.0 - t),
            Colormap::Terrain => multi_stop(TERRAIN_STOPS, t),
            Colormap::Viridis => multi_stop(VIRIDIS_STOPS, t),
        }
    }
}

impl FromStr for Colormap {
    type Err = ValidationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Colormap::ALL
            .into_iter()
            .find(|colormap| colormap.name() == name)
            .ok_or_else(|| ValidationError::UnknownColormap(name.to_string()))
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn gray(t: f64) -> Rgb<u8> {
    let v = (t * 255.0).round() as u8;
    Rgb([v, v, v])
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb<u8> {
    for pair in stops.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        if t <= high.t {
            let ratio = (t - low.t) / (high.t - low.t);
            return Rgb([
                lerp(low.color[0], high.color[0], ratio),
                lerp(low.color[1], high.color[1], ratio),
                lerp(low.color[2], high.color[2], ratio),
            ]);
        }
    }
    Rgb(stops[stops.len() - 1].color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for colormap in Colormap::ALL {
            assert_eq!(colormap.name().parse::<Colormap>(), Ok(colormap));
        }
        assert_eq!(Colormap::default().name(), "Greys_r");
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            "jet".parse::<Colormap>(),
            Err(ValidationError::UnknownColormap("jet".to_string()))
        );
    }

    #[test]
    fn gray_endpoints() {
        assert_eq!(Colormap::GreysR.color(0.0), Rgb([0, 0, 0]));
        assert_eq!(Colormap::GreysR.color(1.0), Rgb([255, 255, 255]));
        assert_eq!(Colormap::Greys.color(0.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn terrain_stops() {
        assert_eq!(Colormap::Terrain.color(-1.0), Rgb([51, 51, 153]));
        assert_eq!(Colormap::Terrain.color(0.5), Rgb([255, 255, 153]));
        assert_eq!(Colormap::Terrain.color(2.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn viridis_midpoint() {
        assert_eq!(Colormap::Viridis.color(0.5), Rgb([33, 144, 141]));
    }
}
