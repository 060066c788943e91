pub mod compose;
pub mod config;
pub mod duration;
pub mod error;

pub use compose::{ComposeFile, Finding, ReadinessProbe, Service, Severity};
pub use config::VectlConfig;
pub use duration::parse_duration;
pub use error::{Result, VectlError};
