use anyhow::{Context, Result};
use clap::Parser;
use xshot_core::capture::{self, CaptureMode, CaptureRequest, X11Connection};
use xshot_core::config::{Config, OutputFormat};
use xshot_core::encode::{self, Quality};
use xshot_core::output::{self, Destination};

/// Takes a screenshot of the root window by default and saves it as a PNG
/// in the current directory.
#[derive(Parser, Debug)]
#[command(name = "xshot", version)]
struct Cli {
    /// Capture the focused window
    #[arg(short = 'u', conflicts_with = "select")]
    focused: bool,

    /// Select a rectangle with the pointer
    #[arg(short = 's')]
    select: bool,

    /// Freeze the display during rectangle selection
    #[arg(short = 'z')]
    freeze: bool,

    /// Save as WebP, quality from 0 to 100 (lossless)
    #[arg(short = 'w', value_name = "QUALITY", allow_negative_numbers = true)]
    webp: Option<i64>,

    /// Delay in seconds before capturing
    #[arg(short = 'd', value_name = "SECONDS", allow_negative_numbers = true)]
    delay: Option<i64>,

    /// Write the image to standard output
    #[arg(short = 't')]
    stdout: bool,

    /// Output path, or a directory when it ends in '/'
    #[arg(short = 'f', value_name = "PATH")]
    path: Option<String>,

    /// More logging (-v info, -vv debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn mode(&self) -> CaptureMode {
        if self.select {
            CaptureMode::Rectangle
        } else if self.focused {
            CaptureMode::FocusedWindow
        } else {
            CaptureMode::WholeScreen
        }
    }

    /// `-w` picks WebP at the given quality; otherwise the config decides.
    fn format(&self, config: &Config) -> (OutputFormat, Quality) {
        match self.webp {
            Some(quality) => (OutputFormat::Webp, Quality::new(quality)),
            None => (config.format, Quality::new(config.quality)),
        }
    }

    fn request(&self, config: &Config) -> CaptureRequest {
        CaptureRequest::new(
            self.mode(),
            self.freeze || config.freeze,
            self.delay.unwrap_or(config.delay),
        )
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().context("failed to load config")?;
    let (format, quality) = cli.format(&config);
    let destination = Destination::resolve(
        cli.stdout,
        cli.path.as_deref(),
        config.output_dir.as_deref(),
        &output::default_filename(format),
    );
    let request = cli.request(&config);
    log::debug!("{request:?}, {format} at quality {}, to {destination}", quality.value());

    let conn = X11Connection::connect().context("failed to open display")?;
    let image = capture::capture(&conn, &request)
        .with_context(|| format!("failed to capture {}", request.mode))?;
    let bytes = encode::encode(&image, format, quality).context("failed to encode image")?;
    destination
        .write(&bytes)
        .with_context(|| format!("failed to write {destination}"))?;

    Ok(())
}
