use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// An output file written under a temporary `.part` name and moved into
/// place only once it is complete. Dropping an uncommitted output removes
/// the partial file, so failed operations leave nothing at the target path.
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub fn new(target: &Path) -> StagedOutput {
        let mut staging: OsString = target.as_os_str().to_owned();
        staging.push(".part");
        StagedOutput {
            target: target.to_path_buf(),
            staging: PathBuf::from(staging),
            committed: false,
        }
    }

    /// The path to write the content to.
    pub fn path(&self) -> &Path {
        &self.staging
    }

    /// Moves the staged file to the target path.
    pub fn commit(mut self) -> io::Result<PathBuf> {
        fs::rename(&self.staging, &self.target)?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if !self.committed && self.staging.exists() {
            if let Err(e) = fs::remove_file(&self.staging) {
                log::warn!(
                    "Failed to remove partial output {}: {}",
                    self.staging.display(),
                    e
                );
            }
        }
    }
}
