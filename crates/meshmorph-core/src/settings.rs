//! Editor settings and the typed events that change them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Color;
use crate::error::{MorphError, MorphResult};
use crate::lattice::LatticeResolution;

/// Shortest and longest accepted morph duration, in seconds.
pub const MIN_DURATION_SECONDS: u32 = 1;
pub const MAX_DURATION_SECONDS: u32 = 15;
pub const DEFAULT_DURATION_SECONDS: u32 = 5;

/// Which of the two images a setting applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Start,
    End,
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRole::Start => write!(f, "start"),
            ImageRole::End => write!(f, "end"),
        }
    }
}

impl std::str::FromStr for ImageRole {
    type Err = MorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(ImageRole::Start),
            "end" => Ok(ImageRole::End),
            other => Err(MorphError::InvalidArgument(format!(
                "image role must be 'start' or 'end', got '{}'",
                other
            ))),
        }
    }
}

/// Overlay elements whose display color can be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRole {
    PrimaryControlPoint,
    HighlightControlPoint,
    PrimaryLattice,
    HighlightLattice,
}

/// A single change requested by the settings surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettingChange {
    ResolutionChanged(LatticeResolution),
    DurationChanged(u32),
    ColorChanged(ColorRole, Color),
    ShowControlPoints(bool),
    ShowLattice(bool),
    BrightnessChanged(ImageRole, i32),
    ExportModeChanged(bool),
}

/// Display and morph settings shared by both image panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub resolution: LatticeResolution,
    pub duration_seconds: u32,
    pub export_mode: bool,
    pub show_control_points: bool,
    pub show_lattice: bool,
    pub primary_control_point: Color,
    pub highlight_control_point: Color,
    pub primary_lattice: Color,
    pub highlight_lattice: Color,
    pub start_brightness: i32,
    pub end_brightness: i32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            resolution: LatticeResolution::default(),
            duration_seconds: DEFAULT_DURATION_SECONDS,
            export_mode: false,
            show_control_points: true,
            show_lattice: true,
            primary_control_point: Color::WHITE,
            highlight_control_point: Color::GREEN,
            primary_lattice: Color::RED,
            highlight_lattice: Color::GREEN,
            start_brightness: 0,
            end_brightness: 0,
        }
    }
}

impl EditorSettings {
    /// Apply one change. Returns whether the lattices must be rebuilt.
    ///
    /// Out-of-range durations and brightness levels are rejected without
    /// touching the current settings.
    pub fn apply(&mut self, change: SettingChange) -> MorphResult<bool> {
        debug!(?change, "apply setting");
        match change {
            SettingChange::ResolutionChanged(resolution) => {
                let changed = self.resolution != resolution;
                self.resolution = resolution;
                Ok(changed)
            }
            SettingChange::DurationChanged(seconds) => {
                validate_duration(seconds)?;
                self.duration_seconds = seconds;
                Ok(false)
            }
            SettingChange::ColorChanged(role, color) => {
                *self.color_mut(role) = color;
                Ok(false)
            }
            SettingChange::ShowControlPoints(show) => {
                self.show_control_points = show;
                Ok(false)
            }
            SettingChange::ShowLattice(show) => {
                self.show_lattice = show;
                Ok(false)
            }
            SettingChange::BrightnessChanged(role, level) => {
                if !(-100..=100).contains(&level) {
                    return Err(MorphError::InvalidArgument(format!(
                        "brightness must be within -100..=100, got {}",
                        level
                    )));
                }
                match role {
                    ImageRole::Start => self.start_brightness = level,
                    ImageRole::End => self.end_brightness = level,
                }
                Ok(false)
            }
            SettingChange::ExportModeChanged(export) => {
                self.export_mode = export;
                Ok(false)
            }
        }
    }

    pub fn color(&self, role: ColorRole) -> Color {
        match role {
            ColorRole::PrimaryControlPoint => self.primary_control_point,
            ColorRole::HighlightControlPoint => self.highlight_control_point,
            ColorRole::PrimaryLattice => self.primary_lattice,
            ColorRole::HighlightLattice => self.highlight_lattice,
        }
    }

    fn color_mut(&mut self, role: ColorRole) -> &mut Color {
        match role {
            ColorRole::PrimaryControlPoint => &mut self.primary_control_point,
            ColorRole::HighlightControlPoint => &mut self.highlight_control_point,
            ColorRole::PrimaryLattice => &mut self.primary_lattice,
            ColorRole::HighlightLattice => &mut self.highlight_lattice,
        }
    }

    pub fn brightness(&self, role: ImageRole) -> i32 {
        match role {
            ImageRole::Start => self.start_brightness,
            ImageRole::End => self.end_brightness,
        }
    }
}

/// Check a morph duration against the accepted range.
pub fn validate_duration(seconds: u32) -> MorphResult<()> {
    if (MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
        Ok(())
    } else {
        Err(MorphError::InvalidArgument(format!(
            "duration must be within {}..={} seconds, got {}",
            MIN_DURATION_SECONDS, MAX_DURATION_SECONDS, seconds
        )))
    }
}
