use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{MorphError, MorphResult};
use crate::lattice::LatticeResolution;
use crate::settings::{validate_duration, DEFAULT_DURATION_SECONDS};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "meshmorph.toml";

/// Nominal tick rate of the morph timeline.
pub const DEFAULT_FPS: u32 = 30;

/// Highest accepted tick rate.
pub const MAX_FPS: u32 = 240;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MorphConfig {
    pub duration_seconds: u32,
    pub lattice_resolution: LatticeResolution,
    pub export_mode: bool,
    pub frames_per_second: u32,
    pub export_dir: PathBuf,
    pub jpeg_quality: u8,
    #[serde(with = "color_string")]
    pub background: Color,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECONDS,
            lattice_resolution: LatticeResolution::default(),
            export_mode: false,
            frames_per_second: DEFAULT_FPS,
            export_dir: PathBuf::from("frames"),
            jpeg_quality: 90,
            background: Color::BLACK,
        }
    }
}

impl MorphConfig {
    pub fn load_from_file(path: &Path) -> MorphResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: MorphConfig =
            toml::from_str(&contents).map_err(|e| MorphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> MorphResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> MorphResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| MorphError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> MorphResult<()> {
        validate_duration(self.duration_seconds)?;
        if !(1..=MAX_FPS).contains(&self.frames_per_second) {
            return Err(MorphError::Config(format!(
                "frames_per_second must be within 1..={}, got {}",
                MAX_FPS, self.frames_per_second
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(MorphError::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Frames in one full morph, `fps * duration`.
    pub fn total_frames(&self) -> u32 {
        self.frames_per_second.saturating_mul(self.duration_seconds)
    }
}

/// Colors are written as palette names or hex strings in the config file.
mod color_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::color::Color;

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&color.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
