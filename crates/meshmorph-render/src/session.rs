//! An editing session: two images, their lattices, the editor and the
//! timeline, kept consistent with one another.
//!
//! Drag input is ignored while a morph is running and a morph cannot start
//! while a drag is in progress.

use std::path::Path;

use tracing::{info, warn};

use meshmorph_core::editor::LatticeEditor;
use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::lattice::Lattice;
use meshmorph_core::project::Project;
use meshmorph_core::settings::{EditorSettings, ImageRole, SettingChange};
use meshmorph_core::sink::FrameSink;
use meshmorph_core::{MorphResult, Point};

use crate::image_loader::{fit_to_area, load_image, match_dimensions};
use crate::timeline::{MorphMode, MorphRequest, MorphTimeline, Ticker, TimelineState};

#[derive(Debug)]
struct Panel {
    source: Option<FrameBuffer>,
    lattice: Lattice,
    editor: LatticeEditor,
}

impl Panel {
    fn new(lattice: Lattice) -> Self {
        Self {
            source: None,
            lattice,
            editor: LatticeEditor::new(),
        }
    }
}

#[derive(Debug)]
pub struct MorphSession {
    settings: EditorSettings,
    width: u32,
    height: u32,
    start: Panel,
    end: Panel,
    timeline: MorphTimeline,
    frames_per_second: u32,
}

impl MorphSession {
    pub fn new(width: u32, height: u32, settings: EditorSettings) -> Self {
        let lattice = Lattice::new(width, height, settings.resolution);
        Self {
            start: Panel::new(lattice.clone()),
            end: Panel::new(lattice),
            settings,
            width,
            height,
            timeline: MorphTimeline::new(),
            frames_per_second: meshmorph_core::DEFAULT_FPS,
        }
    }

    /// Restore a session from a project, loading any recorded images.
    pub fn from_project(project: &Project) -> MorphResult<Self> {
        project.validate()?;
        let (start_lattice, end_lattice) = project.lattices()?;
        let mut session = Self::new(project.width, project.height, project.settings.clone());
        session.start.lattice = start_lattice;
        session.end.lattice = end_lattice;

        for role in [ImageRole::Start, ImageRole::End] {
            if let Some(path) = project.image_path(role) {
                let image = load_image(path)?;
                let fitted = match_dimensions(&image, project.width, project.height)?;
                session.panel_mut(role).source = Some(fitted);
            }
        }
        Ok(session)
    }

    /// Snapshot the session as a project, recording the given image paths.
    pub fn to_project(&self, start_image: Option<&Path>, end_image: Option<&Path>) -> MorphResult<Project> {
        let mut project = Project::from_lattices(&self.start.lattice, &self.end.lattice, &self.settings)?;
        project.start_image = start_image.map(Path::to_path_buf);
        project.end_image = end_image.map(Path::to_path_buf);
        Ok(project)
    }

    fn panel(&self, role: ImageRole) -> &Panel {
        match role {
            ImageRole::Start => &self.start,
            ImageRole::End => &self.end,
        }
    }

    fn panel_mut(&mut self, role: ImageRole) -> &mut Panel {
        match role {
            ImageRole::Start => &mut self.start,
            ImageRole::End => &mut self.end,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn timeline(&self) -> &MorphTimeline {
        &self.timeline
    }

    pub fn state(&self) -> TimelineState {
        self.timeline.state()
    }

    pub fn set_frames_per_second(&mut self, fps: u32) {
        self.frames_per_second = fps;
    }

    pub fn lattice(&self, role: ImageRole) -> &Lattice {
        &self.panel(role).lattice
    }

    /// Install an image for one panel.
    ///
    /// The start image is shrunk to the editing area and fixes the session
    /// dimensions; the end image is rescaled to match them. Lattices are
    /// reset when the dimensions change. A start image too small for the
    /// current resolution is refused and the session is left untouched.
    pub fn set_image(&mut self, role: ImageRole, image: &FrameBuffer) -> MorphResult<()> {
        let fitted = match role {
            ImageRole::Start => fit_to_area(image)?,
            ImageRole::End => match_dimensions(image, self.width, self.height)?,
        };
        if role == ImageRole::Start {
            self.settings.resolution.check_fits(fitted.width, fitted.height)?;
        }
        if role == ImageRole::Start && (fitted.width != self.width || fitted.height != self.height) {
            info!(width = fitted.width, height = fitted.height, "panel resized");
            self.width = fitted.width;
            self.height = fitted.height;
            self.reset_lattices();
            if let Some(end) = self.end.source.take() {
                self.end.source = Some(match_dimensions(&end, self.width, self.height)?);
            }
        }
        self.panel_mut(role).source = Some(fitted);
        Ok(())
    }

    /// The image for `role` with its brightness setting applied.
    pub fn image(&self, role: ImageRole) -> Option<FrameBuffer> {
        self.panel(role)
            .source
            .as_ref()
            .map(|fb| fb.adjust_brightness(self.settings.brightness(role)))
    }

    pub fn has_image(&self, role: ImageRole) -> bool {
        self.panel(role).source.is_some()
    }

    fn reset_lattices(&mut self) {
        let lattice = Lattice::new(self.width, self.height, self.settings.resolution);
        self.start.lattice = lattice.clone();
        self.end.lattice = lattice;
    }

    pub fn apply_setting(&mut self, change: SettingChange) -> MorphResult<()> {
        if let SettingChange::ResolutionChanged(resolution) = change {
            resolution.check_fits(self.width, self.height)?;
        }
        if self.settings.apply(change)? {
            self.reset_lattices();
        }
        Ok(())
    }

    pub fn is_dragging(&self) -> bool {
        self.start.editor.is_dragging() || self.end.editor.is_dragging()
    }

    pub fn begin_drag(&mut self, role: ImageRole, at: Point) -> Option<(usize, usize)> {
        if self.timeline.is_running() {
            return None;
        }
        let panel = self.panel_mut(role);
        panel.editor.begin_drag(&panel.lattice, at)
    }

    pub fn drag_to(&mut self, role: ImageRole, to: Point) -> bool {
        if self.timeline.is_running() {
            return false;
        }
        let panel = self.panel_mut(role);
        panel.editor.drag_to(&mut panel.lattice, to)
    }

    pub fn end_drag(&mut self, role: ImageRole) -> Option<(usize, usize)> {
        self.panel_mut(role).editor.end_drag()
    }

    /// Move one control point under the fold-over guard. Returns whether it moved.
    pub fn move_point(&mut self, role: ImageRole, row: usize, col: usize, to: Point) -> MorphResult<bool> {
        if self.timeline.is_running() {
            return Ok(false);
        }
        let moved = LatticeEditor::try_move(&mut self.panel_mut(role).lattice, row, col, to)?;
        if !moved {
            warn!(%role, row, col, %to, "control point move rejected");
        }
        Ok(moved)
    }

    /// The mode a morph runs in under the current settings: export mode
    /// persists every frame, otherwise frames are only shown.
    pub fn configured_mode(&self) -> MorphMode {
        if self.settings.export_mode {
            MorphMode::Export
        } else {
            MorphMode::Preview
        }
    }

    /// Start a morph using the current images, lattices and settings.
    pub fn start_morph(&mut self, mode: MorphMode) -> MorphResult<()> {
        let start_image = self.image(ImageRole::Start);
        let end_image = self.image(ImageRole::End);
        let request = MorphRequest {
            start_image: start_image.as_ref(),
            end_image: end_image.as_ref(),
            start_lattice: &self.start.lattice,
            end_lattice: &self.end.lattice,
            duration_seconds: self.settings.duration_seconds,
            frames_per_second: self.frames_per_second,
            mode,
            drag_in_progress: self.start.editor.is_dragging() || self.end.editor.is_dragging(),
        };
        self.timeline.start(request)
    }

    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> MorphResult<TimelineState> {
        self.timeline.tick(sink)
    }

    pub fn cancel(&mut self, sink: &mut dyn FrameSink) -> MorphResult<()> {
        self.timeline.cancel(sink)
    }

    /// Start a morph and drive it to the end without a clock.
    pub fn run_morph(&mut self, mode: MorphMode, sink: &mut dyn FrameSink) -> MorphResult<u32> {
        self.start_morph(mode)?;
        self.timeline.run_to_completion(sink)
    }

    /// Start a morph and pace it with `ticker`.
    pub fn run_morph_realtime(
        &mut self,
        mode: MorphMode,
        sink: &mut dyn FrameSink,
        ticker: &mut Ticker,
        should_cancel: impl FnMut(&MorphTimeline) -> bool,
    ) -> MorphResult<u32> {
        self.start_morph(mode)?;
        self.timeline.run_realtime(sink, ticker, should_cancel)
    }
}
