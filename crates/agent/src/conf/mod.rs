//! Conf module — configuration model, loading, and masking rule config.

pub mod load;
pub mod model;

pub use model::{AgentConfig, MaskingConfig, PartialMaskRule};
