//! Still-image capture: `libcamera-still` subprocess and a simulated imager.

use std::path::{Path, PathBuf};
use std::process::Command;

use scalepos_traits::{BoxError, CapturedImage, Imager};

use crate::error::{HwError, Result};

/// Build `item_<n>_<YYYY-mm-dd_HH-MM-SS>.jpg` inside `dir`.
fn image_path(dir: &Path, seq: u64) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    dir.join(format!("item_{seq}_{stamp}.jpg"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Runs an external still-capture command, `libcamera-still -r -n -o <path>` by default.
#[derive(Debug, Clone)]
pub struct CommandImager {
    program: String,
    args: Vec<String>,
    output_dir: PathBuf,
    seq: u64,
}

impl CommandImager {
    pub fn new(program: impl Into<String>, args: Vec<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            output_dir: output_dir.into(),
            seq: 0,
        }
    }

    pub fn libcamera(output_dir: impl Into<PathBuf>) -> Self {
        Self::new("libcamera-still", vec!["-r".into(), "-n".into()], output_dir)
    }

    fn run(&mut self) -> Result<CapturedImage> {
        ensure_dir(&self.output_dir)?;
        self.seq += 1;
        let path = image_path(&self.output_dir, self.seq);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("-o")
            .arg(&path)
            .output()
            .map_err(|e| HwError::Camera {
                command: self.program.clone(),
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HwError::Camera {
                command: self.program.clone(),
                detail: format!("{} {}", output.status, stderr.trim()),
            });
        }
        tracing::info!(path = %path.display(), "image captured");
        Ok(CapturedImage::new(path))
    }
}

impl Imager for CommandImager {
    fn capture(&mut self) -> std::result::Result<CapturedImage, BoxError> {
        Ok(self.run()?)
    }
}

/// Writes an empty placeholder file per capture; can be told to fail.
#[derive(Debug, Clone)]
pub struct SimulatedImager {
    output_dir: PathBuf,
    seq: u64,
    fail: bool,
}

impl SimulatedImager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            seq: 0,
            fail: false,
        }
    }

    /// Every capture fails like a camera returning a non-zero exit status.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Imager for SimulatedImager {
    fn capture(&mut self) -> std::result::Result<CapturedImage, BoxError> {
        if self.fail {
            return Err(Box::new(HwError::Camera {
                command: "simulated".into(),
                detail: "exit status: 1".into(),
            }));
        }
        ensure_dir(&self.output_dir)?;
        self.seq += 1;
        let path = image_path(&self.output_dir, self.seq);
        std::fs::write(&path, b"")?;
        tracing::debug!(path = %path.display(), "simulated image captured");
        Ok(CapturedImage::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_imager_writes_sequenced_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut imager = SimulatedImager::new(dir.path().join("images"));
        let a = imager.capture().unwrap();
        let b = imager.capture().unwrap();
        assert!(a.path().exists());
        assert!(b.path().exists());
        let name = b.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("item_2_"), "{name}");
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn failing_simulated_imager_reports_camera_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut imager = SimulatedImager::new(dir.path()).failing();
        let err = imager.capture().unwrap_err();
        assert!(err.downcast_ref::<HwError>().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn command_imager_nonzero_exit_is_camera_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut imager = CommandImager::new("false", vec![], dir.path());
        match imager.run() {
            Err(HwError::Camera { command, .. }) => assert_eq!(command, "false"),
            other => panic!("expected camera error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn command_imager_missing_program_is_camera_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut imager = CommandImager::new("scalepos-no-such-camera", vec![], dir.path());
        assert!(matches!(imager.run(), Err(HwError::Camera { .. })));
    }
}
