//! On-disk morph project.
//!
//! A project records the panel size, lattice resolution, both lattices as
//! row-major coordinate lists, the editor settings and the paths of the two
//! source images. Lattices are restored exactly as saved.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MorphError, MorphResult};
use crate::lattice::{Lattice, LatticeResolution};
use crate::math::Point;
use crate::settings::{validate_duration, EditorSettings, ImageRole};

/// Format version written into every project file.
pub const PROJECT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    /// Also carries the lattice resolution both point lists are laid out for.
    #[serde(default)]
    pub settings: EditorSettings,
    #[serde(default)]
    pub start_image: Option<PathBuf>,
    #[serde(default)]
    pub end_image: Option<PathBuf>,
    pub start_points: Vec<Point>,
    pub end_points: Vec<Point>,
}

impl Project {
    /// Snapshot two lattices and the current settings into a project.
    pub fn from_lattices(
        start: &Lattice,
        end: &Lattice,
        settings: &EditorSettings,
    ) -> MorphResult<Project> {
        check_pair(start, end)?;
        let mut settings = settings.clone();
        settings.resolution = start.resolution();
        Ok(Project {
            version: PROJECT_VERSION,
            width: start.width(),
            height: start.height(),
            settings,
            start_image: None,
            end_image: None,
            start_points: start.points().to_vec(),
            end_points: end.points().to_vec(),
        })
    }

    /// A fresh project with default lattices over a `width x height` panel.
    pub fn new(width: u32, height: u32, settings: EditorSettings) -> Project {
        let start = Lattice::new(width, height, settings.resolution);
        Project {
            version: PROJECT_VERSION,
            width,
            height,
            start_points: start.points().to_vec(),
            end_points: start.points().to_vec(),
            settings,
            start_image: None,
            end_image: None,
        }
    }

    pub fn resolution(&self) -> LatticeResolution {
        self.settings.resolution
    }

    pub fn image_path(&self, role: ImageRole) -> Option<&Path> {
        match role {
            ImageRole::Start => self.start_image.as_deref(),
            ImageRole::End => self.end_image.as_deref(),
        }
    }

    pub fn set_image_path(&mut self, role: ImageRole, path: Option<PathBuf>) {
        match role {
            ImageRole::Start => self.start_image = path,
            ImageRole::End => self.end_image = path,
        }
    }

    /// Re-hydrate both lattices without re-deriving their positions.
    pub fn lattices(&self) -> MorphResult<(Lattice, Lattice)> {
        let start = Lattice::from_points(
            self.width,
            self.height,
            self.resolution(),
            self.start_points.clone(),
        )?;
        let end = Lattice::from_points(
            self.width,
            self.height,
            self.resolution(),
            self.end_points.clone(),
        )?;
        Ok((start, end))
    }

    /// Replace the lattice stored for `role`.
    pub fn store_lattice(&mut self, role: ImageRole, lattice: &Lattice) -> MorphResult<()> {
        if lattice.resolution() != self.resolution() {
            return Err(MorphError::ResolutionMismatch {
                start: self.resolution().n(),
                end: lattice.n(),
            });
        }
        let points = lattice.points().to_vec();
        match role {
            ImageRole::Start => self.start_points = points,
            ImageRole::End => self.end_points = points,
        }
        Ok(())
    }

    /// Replace both lattices with the default grid for the current
    /// resolution, as required after the resolution changes.
    pub fn reset_lattices(&mut self) {
        let fresh = Lattice::new(self.width, self.height, self.resolution());
        self.start_points = fresh.points().to_vec();
        self.end_points = fresh.points().to_vec();
    }

    /// Check the project is internally consistent.
    pub fn validate(&self) -> MorphResult<()> {
        if self.version != PROJECT_VERSION {
            return Err(MorphError::InvalidArgument(format!(
                "unsupported project version {}",
                self.version
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MorphError::InvalidArgument(
                "project dimensions must be non-zero".into(),
            ));
        }
        self.resolution().check_fits(self.width, self.height)?;
        validate_duration(self.settings.duration_seconds)?;
        self.lattices().map(|_| ())
    }

    pub fn save(&self, path: &Path) -> MorphResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "saved project");
        Ok(())
    }

    pub fn load(path: &Path) -> MorphResult<Project> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MorphError::asset(format!("cannot read project: {}", e), path))?;
        let project: Project = serde_json::from_str(&contents)?;
        project.validate()?;
        Ok(project)
    }
}

fn check_pair(start: &Lattice, end: &Lattice) -> MorphResult<()> {
    if start.resolution() != end.resolution() {
        return Err(MorphError::ResolutionMismatch {
            start: start.n(),
            end: end.n(),
        });
    }
    if start.width() != end.width() || start.height() != end.height() {
        return Err(MorphError::InvalidArgument(format!(
            "lattice dimensions differ: {}x{} vs {}x{}",
            start.width(),
            start.height(),
            end.width(),
            end.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingChange;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("meshmorph_project_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_round_trip_keeps_edited_points() {
        let start = Lattice::new(200, 100, LatticeResolution::Five);
        let mut end = start.clone();
        end.set_point(2, 2, Point::new(110, 55)).unwrap();

        let mut project = Project::from_lattices(&start, &end, &EditorSettings {
            resolution: LatticeResolution::Five,
            ..EditorSettings::default()
        })
        .unwrap();
        project.set_image_path(ImageRole::Start, Some(PathBuf::from("a.png")));

        let path = scratch("round_trip");
        project.save(&path).unwrap();
        let loaded = Project::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, project);
        let (s, e) = loaded.lattices().unwrap();
        assert_eq!(s, start);
        assert_eq!(e.point(2, 2), Point::new(110, 55));
        assert_eq!(loaded.image_path(ImageRole::Start), Some(Path::new("a.png")));
        assert_eq!(loaded.image_path(ImageRole::End), None);
    }

    #[test]
    fn test_from_lattices_rejects_mismatch() {
        let a = Lattice::new(100, 100, LatticeResolution::Five);
        let b = Lattice::new(100, 100, LatticeResolution::Ten);
        assert!(matches!(
            Project::from_lattices(&a, &b, &EditorSettings::default()),
            Err(MorphError::ResolutionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_point_count() {
        let mut project = Project::new(100, 100, EditorSettings::default());
        project.end_points.pop();
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_resolution_stored_once() {
        let mut project = Project::new(100, 100, EditorSettings::default());
        project
            .settings
            .apply(SettingChange::ResolutionChanged(LatticeResolution::Twenty))
            .unwrap();
        assert!(project.validate().is_err());
        project.reset_lattices();
        project.validate().unwrap();
        let (start, end) = project.lattices().unwrap();
        assert_eq!(start.n(), 20);
        assert_eq!(end, start);

        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("resolution").is_none());
        assert_eq!(json["settings"]["resolution"], 20);
    }

    #[test]
    fn test_validate_rejects_undersized_panel() {
        let project = Project::new(16, 16, EditorSettings {
            resolution: LatticeResolution::Twenty,
            ..EditorSettings::default()
        });
        assert!(matches!(project.validate(), Err(MorphError::InvalidArgument(_))));
    }

    #[test]
    fn test_load_missing_file_is_asset_error() {
        let err = Project::load(Path::new("/nonexistent/meshmorph.json")).unwrap_err();
        assert!(matches!(err, MorphError::Asset { .. }));
    }
}
