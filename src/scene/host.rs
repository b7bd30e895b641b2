use super::document::SceneDocument;
use super::script::render_script;
use crate::errors::{HillmapError, ValidationError};
use crate::staging::StagedOutput;
use crate::validate::check_characters;
use crate::Result;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lines of the host's error output kept in a `RenderFailed` message.
const STDERR_TAIL_LINES: usize = 20;

static SCRIPT_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Something that can render a configured scene document to a still image.
pub trait RenderHost {
    /// Renders one still of `document` to `output`. Nothing is left at
    /// `output` when rendering fails.
    fn render(&self, document: &SceneDocument, output: &Path) -> Result<()>;
}

/// Renders through a Blender executable run in the background with a
/// generated Python script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlenderHost {
    executable: PathBuf,
}

impl BlenderHost {
    /// # Arguments
    ///
    /// * `executable` - Path to the Blender binary, or a bare program name
    ///   looked up on `PATH`.
    pub fn new(executable: &Path) -> Result<BlenderHost> {
        check_characters("blender", executable)?;
        let resolved = resolve_executable(executable).ok_or_else(|| {
            ValidationError::PathNotFound {
                param: "blender".to_string(),
                path: executable.to_path_buf(),
            }
        })?;

        log::debug!("Using Blender at {}", resolved.display());
        Ok(BlenderHost {
            executable: resolved,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

fn resolve_executable(executable: &Path) -> Option<PathBuf> {
    if executable.is_file() {
        return Some(executable.to_path_buf());
    }
    if executable.components().count() != 1 {
        return None;
    }

    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .map(|dir| dir.join(executable))
        .find(|candidate| candidate.is_file())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Removes the generated script when the render is done.
struct ScriptFile(PathBuf);

impl Drop for ScriptFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            log::warn!("Failed to remove {}: {}", self.0.display(), e);
        }
    }
}

impl RenderHost for BlenderHost {
    fn render(&self, document: &SceneDocument, output: &Path) -> Result<()> {
        let output = absolute(output)?;
        let staged = StagedOutput::new(&output);

        let script_path = env::temp_dir().join(format!(
            "hillmap-render-{}-{}.py",
            std::process::id(),
            SCRIPT_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&script_path, render_script(document, staged.path()))?;
        let script = ScriptFile(script_path);

        log::info!(
            "Rendering {} with {}",
            output.display(),
            self.executable.display()
        );
        let result = Command::new(&self.executable)
            .arg("--background")
            .arg("--factory-startup")
            .arg("--python-exit-code")
            .arg("1")
            .arg("--python")
            .arg(&script.0)
            .output()?;
        drop(script);

        if !result.status.success() {
            return Err(HillmapError::RenderFailed(format!(
                "Blender exited with {}:\n{}",
                result.status,
                stderr_tail(&result.stderr)
            )));
        }
        if !staged.path().is_file() {
            return Err(HillmapError::RenderFailed(format!(
                "Blender finished without writing {}",
                output.display()
            )));
        }

        staged.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable() {
        let result = BlenderHost::new(Path::new("/no/such/dir/blender"));
        assert!(matches!(
            result,
            Err(HillmapError::Validation(ValidationError::PathNotFound { .. }))
        ));
    }

    #[test]
    fn rejects_suspicious_executable_path() {
        let result = BlenderHost::new(Path::new("/usr/bin/blender;rm"));
        assert!(matches!(
            result,
            Err(HillmapError::Validation(
                ValidationError::InvalidCharacter { .. }
            ))
        ));
    }

    #[test]
    fn existing_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let executable = dir.path().join("blender");
        fs::write(&executable, b"").unwrap();

        let host = BlenderHost::new(&executable).unwrap();
        assert_eq!(host.executable(), executable.as_path());
    }

    #[test]
    fn keeps_the_end_of_stderr() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_host_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("render.png");

        let host = BlenderHost::new(Path::new("/bin/false")).unwrap();
        let result = host.render(&SceneDocument::factory_startup(), &output);

        assert!(matches!(result, Err(HillmapError::RenderFailed(_))));
        assert!(!output.exists());
    }
}
