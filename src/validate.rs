use crate::errors::ValidationError;
use std::path::Path;
use std::str::FromStr;

/// The role a path plays in an operation, which decides the extensions it
/// may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    GeoTiff,
    Geometry,
    Downsample,
    ImageConversion,
    Render,
    Plot,
    Executable,
}

impl PathRole {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            PathRole::GeoTiff => &["tif", "tiff"],
            PathRole::Geometry => &["shp", "json", "geojson"],
            PathRole::Downsample => &["png", "bmp", "tif", "tiff"],
            PathRole::ImageConversion => {
                &["png", "bmp", "jpg", "jpeg", "tif", "tiff"]
            }
            PathRole::Render => &["png", "jpg", "jpeg", "bmp", "tif", "tiff"],
            PathRole::Plot => &["png", "bmp", "jpg", "jpeg"],
            PathRole::Executable => &[],
        }
    }
}

/// Parses a textual parameter, reporting a `TypeMismatch` that names the
/// parameter when the value is not of the expected kind.
pub fn parse_param<T: FromStr>(
    param: &str,
    expected: &'static str,
    value: &str,
) -> Result<T, ValidationError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ValidationError::TypeMismatch {
            param: param.to_string(),
            expected,
            value: value.to_string(),
        })
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '-' | '\\' | '/' | '.' | ':')
        || c.is_whitespace()
}

/// Rejects paths containing anything besides ASCII alphanumerics, `_-\/.:`
/// and whitespace.
pub fn check_characters(
    param: &str,
    path: &Path,
) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidCharacter {
        param: param.to_string(),
        value: path.to_string_lossy().into_owned(),
    };

    let text = path.to_str().ok_or_else(invalid)?;
    if text.chars().all(is_allowed_char) {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Case-insensitive extension test.
pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn check_extension(
    param: &str,
    path: &Path,
    role: PathRole,
) -> Result<(), ValidationError> {
    let allowed = role.extensions();
    if allowed.is_empty() || has_extension(path, allowed) {
        Ok(())
    } else {
        Err(ValidationError::InvalidExtension {
            param: param.to_string(),
            path: path.to_path_buf(),
            allowed: allowed.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum PathKind {
    Input,
    Output,
}

#[derive(Debug)]
struct PathCheck<'a> {
    param: &'a str,
    path: &'a Path,
    role: PathRole,
    kind: PathKind,
}

#[derive(Debug)]
struct RuleCheck<'a> {
    param: &'a str,
    holds: bool,
    reason: String,
}

/// Collects the checks of one operation and runs them in a fixed order:
/// character whitelist for every path, then existence and extension of every
/// path, then the numeric rules.
#[derive(Debug, Default)]
pub struct Checks<'a> {
    paths: Vec<PathCheck<'a>>,
    rules: Vec<RuleCheck<'a>>,
}

impl<'a> Checks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// An existing file with an extension allowed for `role`.
    pub fn input(mut self, param: &'a str, path: &'a Path, role: PathRole) -> Self {
        self.paths.push(PathCheck {
            param,
            path,
            role,
            kind: PathKind::Input,
        });
        self
    }

    /// A file to be created: its parent directory must exist and its
    /// extension must be allowed for `role`.
    pub fn output(mut self, param: &'a str, path: &'a Path, role: PathRole) -> Self {
        self.paths.push(PathCheck {
            param,
            path,
            role,
            kind: PathKind::Output,
        });
        self
    }

    /// `value` must lie in `[min, max]`.
    pub fn within(self, param: &'a str, value: f64, min: f64, max: f64) -> Self {
        let holds = value.is_finite() && value >= min && value <= max;
        self.rule(
            param,
            holds,
            format!("{} is not between {} and {}", value, min, max),
        )
    }

    pub fn at_least(self, param: &'a str, value: f64, min: f64) -> Self {
        let holds = value.is_finite() && value >= min;
        self.rule(param, holds, format!("{} is less than {}", value, min))
    }

    pub fn rule(mut self, param: &'a str, holds: bool, reason: String) -> Self {
        self.rules.push(RuleCheck {
            param,
            holds,
            reason,
        });
        self
    }

    pub fn run(self) -> Result<(), ValidationError> {
        for check in &self.paths {
            check_characters(check.param, check.path)?;
        }

        for check in &self.paths {
            match check.kind {
                PathKind::Input => {
                    if !check.path.exists() {
                        return Err(ValidationError::PathNotFound {
                            param: check.param.to_string(),
                            path: check.path.to_path_buf(),
                        });
                    }
                    check_extension(check.param, check.path, check.role)?;
                }
                PathKind::Output => {
                    check_extension(check.param, check.path, check.role)?;
                    let parent = check
                        .path
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .unwrap_or_else(|| Path::new("."));
                    if !parent.is_dir() {
                        return Err(ValidationError::PathNotFound {
                            param: check.param.to_string(),
                            path: parent.to_path_buf(),
                        });
                    }
                }
            }
        }

        for rule in self.rules {
            if !rule.holds {
                return Err(ValidationError::OutOfRange {
                    param: rule.param.to_string(),
                    reason: rule.reason,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::path::PathBuf;

    #[rstest]
    #[case("data/dem.tif", true)]
    #[case("C:\\maps\\dem file.tif", true)]
    #[case("/tmp/dem-v1_2.tiff", true)]
    #[case("/tmp/dem;rm.tif", false)]
    #[case("/tmp/dém.tif", false)]
    #[case("/tmp/$HOME.tif", false)]
    fn character_whitelist(#[case] path: &str, #[case] accepted: bool) {
        let result = check_characters("input", Path::new(path));
        assert_eq!(result.is_ok(), accepted);
    }

    /// Extensions are compared without regard to case.
    #[rstest]
    #[case("dem.TIF", true)]
    #[case("dem.Tiff", true)]
    #[case("dem.png", false)]
    #[case("dem", false)]
    fn geotiff_extensions(#[case] path: &str, #[case] accepted: bool) {
        assert_eq!(
            has_extension(Path::new(path), PathRole::GeoTiff.extensions()),
            accepted
        );
    }

    #[test]
    fn parse_param_reports_the_parameter() {
        let error = parse_param::<f64>("north", "float", "abc").unwrap_err();
        assert_eq!(
            error,
            ValidationError::TypeMismatch {
                param: "north".to_string(),
                expected: "float",
                value: "abc".to_string(),
            }
        );
        assert_eq!(parse_param::<i32>("samples", "integer", " 20 "), Ok(20));
    }

    /// A missing input is reported before a numeric range violation.
    #[test]
    fn paths_are_checked_before_ranges() {
        let missing = PathBuf::from("/definitely/not/here.tif");
        let result = Checks::new()
            .input("input", &missing, PathRole::GeoTiff)
            .within("north", 100.0, -90.0, 90.0)
            .run();
        assert!(matches!(result, Err(ValidationError::PathNotFound { .. })));
    }

    /// Invalid characters are reported before missing paths.
    #[test]
    fn characters_are_checked_before_existence() {
        let missing = PathBuf::from("/definitely/not/here.tif");
        let bad = PathBuf::from("/tmp/out?.tif");
        let result = Checks::new()
            .input("input", &missing, PathRole::GeoTiff)
            .output("output", &bad, PathRole::GeoTiff)
            .run();
        assert!(matches!(
            result,
            Err(ValidationError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn output_requires_existing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("out.tif");
        let bad = dir.path().join("missing").join("out.tif");
        assert!(Checks::new()
            .output("output", &good, PathRole::GeoTiff)
            .run()
            .is_ok());
        assert!(matches!(
            Checks::new().output("output", &bad, PathRole::GeoTiff).run(),
            Err(ValidationError::PathNotFound { .. })
        ));
    }

    #[test]
    fn input_with_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.txt");
        File::create(&path).unwrap();
        assert!(matches!(
            Checks::new().input("input", &path, PathRole::GeoTiff).run(),
            Err(ValidationError::InvalidExtension { .. })
        ));
    }

    #[rstest]
    #[case(90.0, true)]
    #[case(-90.0, true)]
    #[case(90.5, false)]
    #[case(f64::NAN, false)]
    fn latitude_range(#[case] value: f64, #[case] accepted: bool) {
        let result = Checks::new().within("north", value, -90.0, 90.0).run();
        assert_eq!(result.is_ok(), accepted);
    }
}
