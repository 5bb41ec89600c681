pub mod capture;
pub mod config;
pub mod encode;
pub mod output;

pub use image;

pub use capture::{CaptureError, CaptureMode, CaptureRequest};
pub use config::{Config, OutputFormat};
pub use encode::{EncodeError, Quality};
pub use output::Destination;
