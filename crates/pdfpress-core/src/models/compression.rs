use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Named resolution tier for image downsampling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPreset {
    /// Leave image resolution untouched
    #[default]
    Unchanged,
    Print,
    Ebook,
    Screen,
}

impl ResolutionPreset {
    /// Target DPI for downsampling, `None` when images keep their resolution
    pub fn target_dpi(self) -> Option<u32> {
        match self {
            ResolutionPreset::Unchanged => None,
            ResolutionPreset::Print => Some(300),
            ResolutionPreset::Ebook => Some(150),
            ResolutionPreset::Screen => Some(72),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionPreset::Unchanged => "unchanged",
            ResolutionPreset::Print => "print",
            ResolutionPreset::Ebook => "ebook",
            ResolutionPreset::Screen => "screen",
        }
    }

    /// Parse a form value, falling back to the default for missing or unknown values
    pub fn from_form_value(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ResolutionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unchanged" => Ok(ResolutionPreset::Unchanged),
            "print" => Ok(ResolutionPreset::Print),
            "ebook" => Ok(ResolutionPreset::Ebook),
            "screen" => Ok(ResolutionPreset::Screen),
            other => Err(format!("unknown resolution preset '{}'", other)),
        }
    }
}

impl Display for ResolutionPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Named image quality tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    VeryHigh,
    #[default]
    High,
    Medium,
}

impl QualityPreset {
    /// Quality score on a 0-100 scale (higher = better visual fidelity)
    pub fn score(self) -> u8 {
        match self {
            QualityPreset::VeryHigh => 95,
            QualityPreset::High => 80,
            QualityPreset::Medium => 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityPreset::VeryHigh => "very_high",
            QualityPreset::High => "high",
            QualityPreset::Medium => "medium",
        }
    }

    /// Parse a form value, falling back to the default for missing or unknown values
    pub fn from_form_value(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "very_high" => Ok(QualityPreset::VeryHigh),
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            other => Err(format!("unknown quality preset '{}'", other)),
        }
    }
}

impl Display for QualityPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved settings for one compression run.
///
/// Built once from the request form and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompressionSettings {
    pub resolution: ResolutionPreset,
    pub quality: QualityPreset,
}

impl CompressionSettings {
    pub fn new(resolution: ResolutionPreset, quality: QualityPreset) -> Self {
        Self {
            resolution,
            quality,
        }
    }

    /// Resolve settings from raw `dpi` / `quality` form fields
    pub fn from_form(dpi: Option<&str>, quality: Option<&str>) -> Self {
        Self {
            resolution: ResolutionPreset::from_form_value(dpi),
            quality: QualityPreset::from_form_value(quality),
        }
    }

    pub fn target_dpi(&self) -> Option<u32> {
        self.resolution.target_dpi()
    }

    pub fn quality_score(&self) -> u8 {
        self.quality.score()
    }
}
