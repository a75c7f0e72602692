pub mod loader;
pub mod models;

pub use models::{Config, DensityConfig, SegmentationConfig};

/// Environment access, abstracted so tests can point `HOME` elsewhere.
pub trait Env {
    fn var(&self, key: &str) -> Result<String, std::env::VarError>;
}

/// Process environment.
pub struct RealEnv;

impl Env for RealEnv {
    fn var(&self, key: &str) -> Result<String, std::env::VarError> {
        std::env::var(key)
    }
}
