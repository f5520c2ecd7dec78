//! Locating the encoder executable and reading its version banner.

use crate::{Error, Result, ToolCommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// A resolved encoder executable.
///
/// # Example
///
/// ```no_run
/// use passforge_av::Encoder;
/// use std::path::Path;
///
/// # async fn example() -> passforge_av::Result<()> {
/// let encoder = Encoder::resolve(Path::new("ffmpeg"))?;
/// if let Some(banner) = encoder.version().await {
///     println!("{banner}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    path: PathBuf,
}

impl Encoder {
    /// Resolve `program` to an executable.
    ///
    /// Anything with a directory component is treated as an explicit path and
    /// must exist. A bare name is looked up on `PATH`.
    pub fn resolve(program: &Path) -> Result<Self> {
        if program.is_absolute() || program.components().count() > 1 {
            if !program.exists() {
                return Err(Error::MissingExecutable(program.to_path_buf()));
            }
            return Ok(Self {
                path: program.to_path_buf(),
            });
        }

        let name = program.to_string_lossy();
        let path = which::which(name.as_ref()).map_err(|_| Error::EncoderNotFound {
            program: name.to_string(),
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// First line of `-version` output, or `None` if the encoder does not
    /// answer it successfully.
    pub async fn version(&self) -> Option<String> {
        let mut cmd = ToolCommand::new(&self.path);
        cmd.arg("-version").timeout(VERSION_TIMEOUT);

        let output = cmd.output().await.ok().filter(|o| o.success())?;
        output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}
