pub mod compression;

pub use compression::{CompressionSettings, QualityPreset, ResolutionPreset};
