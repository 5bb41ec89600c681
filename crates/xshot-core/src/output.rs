use crate::config::OutputFormat;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generated name for a screenshot taken now, in local time.
pub fn default_filename(format: OutputFormat) -> String {
    filename_at(Local::now().naive_local(), format)
}

/// `screenshot_YYYY-MM-DD-HH-MM-SS.<ext>`
pub fn filename_at(time: NaiveDateTime, format: OutputFormat) -> String {
    format!(
        "screenshot_{}.{}",
        time.format("%Y-%m-%d-%H-%M-%S"),
        format.extension()
    )
}

/// Where the encoded image goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout => write!(f, "standard output"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Destination {
    /// Standard output wins over any path. A path ending in `/` is a
    /// directory that gets `filename` appended; without a path, `filename`
    /// goes into `default_dir` (or the working directory).
    pub fn resolve(
        to_stdout: bool,
        path: Option<&str>,
        default_dir: Option<&Path>,
        filename: &str,
    ) -> Self {
        if to_stdout {
            return Destination::Stdout;
        }
        match path {
            Some(dir) if dir.ends_with('/') => Destination::File(Path::new(dir).join(filename)),
            Some(file) => Destination::File(PathBuf::from(file)),
            None => match default_dir {
                Some(dir) => Destination::File(dir.join(filename)),
                None => Destination::File(PathBuf::from(filename)),
            },
        }
    }

    pub fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Destination::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            Destination::File(path) => {
                std::fs::write(path, bytes)?;
                log::info!("saved {}", path.display());
                Ok(())
            }
        }
    }
}
