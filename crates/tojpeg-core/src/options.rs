use tojpeg_common::{Background, Suffix};

/// JPEG quality, always inside the encoder range 1..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;
    pub const DEFAULT: u8 = 85;

    /// Out-of-range values are clamped, never rejected
    pub fn new(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value as i64)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quality presets offered in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualitySettings {
    /// Largest files, no visible loss (JPEG 100)
    Maximum,

    /// Photos meant for printing or further editing (JPEG 92)
    High,

    /// Good default for sharing (JPEG 85)
    Balanced,

    /// Smaller files for web/email (JPEG 75)
    Low,

    /// Custom quality value
    Custom(u8),
}

impl QualitySettings {
    pub const PRESETS: [QualitySettings; 4] = [Self::Low, Self::Balanced, Self::High, Self::Maximum];

    /// Get JPEG quality value
    pub fn jpeg_quality(&self) -> Quality {
        match self {
            Self::Maximum => Quality(100),
            Self::High => Quality(92),
            Self::Balanced => Quality(85),
            Self::Low => Quality(75),
            Self::Custom(q) => Quality::from(*q),
        }
    }

    /// Snap a raw value back onto a preset when it matches one
    pub fn from_quality(quality: Quality) -> Self {
        Self::PRESETS
            .into_iter()
            .find(|preset| preset.jpeg_quality() == quality)
            .unwrap_or(Self::Custom(quality.value()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Maximum => "Maximum",
            Self::High => "High",
            Self::Balanced => "Balanced",
            Self::Low => "Low",
            Self::Custom(_) => "Custom",
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Options shared by every file of a job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOptions {
    pub quality: Quality,

    /// Composite color for transparent pixels
    pub background: Background,

    /// Replace existing files instead of picking a numbered name
    pub overwrite: bool,

    /// Suffix for items that do not carry their own
    pub suffix: Suffix,
}

impl ConversionOptions {
    pub fn with_quality(mut self, quality: impl Into<Quality>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_suffix(mut self, suffix: Suffix) -> Self {
        self.suffix = suffix;
        self
    }
}
