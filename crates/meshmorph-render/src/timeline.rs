//! The morph timeline state machine.
//!
//! `Idle -> Running -> {Completed, Cancelled}`. Starting captures both
//! images and both lattices by value and derives the static start and end
//! meshes once. Every tick renders one frame, hands it to a [`FrameSink`]
//! and advances; a tick is atomic and cancellation is only possible between
//! ticks. For a morph of `fps * duration` frames, frame `k` (0-based) is
//! rendered at `t = k / (fps * duration)`, except the last frame which is
//! rendered at `t = 1` so the final output is exactly the end configuration.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::lattice::Lattice;
use meshmorph_core::mesh::Mesh;
use meshmorph_core::settings::validate_duration;
use meshmorph_core::sink::{FrameSink, MorphFrame, MorphOutcome};
use meshmorph_core::{MorphError, MorphResult};

use crate::compositor::{compose_frame, FrameMeshes};

/// Lifecycle of a morph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimelineState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Whether frames go to a live display or to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphMode {
    Preview,
    Export,
}

impl std::fmt::Display for MorphMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MorphMode::Preview => write!(f, "preview"),
            MorphMode::Export => write!(f, "export"),
        }
    }
}

/// Everything needed to start a morph.
#[derive(Debug, Clone, Copy)]
pub struct MorphRequest<'a> {
    pub start_image: Option<&'a FrameBuffer>,
    pub end_image: Option<&'a FrameBuffer>,
    pub start_lattice: &'a Lattice,
    pub end_lattice: &'a Lattice,
    pub duration_seconds: u32,
    pub frames_per_second: u32,
    pub mode: MorphMode,
    /// Set while the editor has a drag in progress; starting is refused.
    pub drag_in_progress: bool,
}

/// State owned by a running morph.
#[derive(Debug)]
struct ActiveMorph {
    start_image: FrameBuffer,
    end_image: FrameBuffer,
    start_lattice: Lattice,
    end_lattice: Lattice,
    start_mesh: Mesh,
    end_mesh: Mesh,
    mode: MorphMode,
    total_frames: u32,
    next_frame: u32,
    delta_t: f64,
}

impl ActiveMorph {
    fn time_of(&self, frame: u32) -> f64 {
        if frame + 1 >= self.total_frames {
            1.0
        } else {
            frame as f64 * self.delta_t
        }
    }
}

#[derive(Debug, Default)]
pub struct MorphTimeline {
    state: TimelineState,
    active: Option<ActiveMorph>,
    t: f64,
    frames_emitted: u32,
}

impl MorphTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimelineState::Running
    }

    /// Time of the most recently rendered frame.
    pub fn t(&self) -> f64 {
        self.t
    }

    /// Frames handed to the sink by the current or last morph.
    pub fn frames_emitted(&self) -> u32 {
        self.frames_emitted
    }

    /// Frames the current morph will produce, if one is running.
    pub fn total_frames(&self) -> Option<u32> {
        self.active.as_ref().map(|m| m.total_frames)
    }

    pub fn progress_percent(&self) -> u32 {
        (self.t * 100.0) as u32
    }

    /// Enter `Running`. Every precondition is checked before any state changes.
    pub fn start(&mut self, request: MorphRequest<'_>) -> MorphResult<()> {
        if self.state == TimelineState::Running {
            return Err(MorphError::InvalidState("a morph is already running".into()));
        }
        if request.drag_in_progress {
            return Err(MorphError::InvalidState(
                "cannot start a morph while a control point is being dragged".into(),
            ));
        }
        let start_image = request
            .start_image
            .ok_or_else(|| MorphError::missing_image("start"))?;
        let end_image = request
            .end_image
            .ok_or_else(|| MorphError::missing_image("end"))?;

        let (sl, el) = (request.start_lattice, request.end_lattice);
        if sl.resolution() != el.resolution() {
            return Err(MorphError::ResolutionMismatch {
                start: sl.n(),
                end: el.n(),
            });
        }
        validate_duration(request.duration_seconds)?;
        if request.frames_per_second == 0 {
            return Err(MorphError::InvalidArgument(
                "frames per second must be positive".into(),
            ));
        }
        let total_frames = request
            .frames_per_second
            .checked_mul(request.duration_seconds)
            .ok_or_else(|| {
                MorphError::InvalidArgument(format!(
                    "{} fps over {}s overflows the frame counter",
                    request.frames_per_second, request.duration_seconds
                ))
            })?;
        for (role, image, lattice) in [("start", start_image, sl), ("end", end_image, el)] {
            if image.width != lattice.width() || image.height != lattice.height() {
                return Err(MorphError::InvalidArgument(format!(
                    "{} image is {}x{} but its lattice spans {}x{}",
                    role,
                    image.width,
                    image.height,
                    lattice.width(),
                    lattice.height()
                )));
            }
        }
        if !start_image.same_size(end_image) {
            return Err(MorphError::InvalidArgument(format!(
                "start image is {}x{} but end image is {}x{}",
                start_image.width, start_image.height, end_image.width, end_image.height
            )));
        }
        sl.resolution().check_fits(start_image.width, start_image.height)?;

        let start_mesh = Mesh::build(sl);
        let end_mesh = Mesh::build(el);
        for (role, mesh) in [("start", &start_mesh), ("end", &end_mesh)] {
            if let Some((family, row, col)) = mesh.first_degenerate() {
                return Err(MorphError::InvalidArgument(format!(
                    "{} lattice collapses {} triangle ({}, {}) to zero area",
                    role, family, row, col
                )));
            }
        }

        let active = ActiveMorph {
            start_image: start_image.to_rgba8(),
            end_image: end_image.to_rgba8(),
            start_mesh,
            end_mesh,
            start_lattice: sl.clone(),
            end_lattice: el.clone(),
            mode: request.mode,
            total_frames,
            next_frame: 0,
            delta_t: 1.0 / total_frames as f64,
        };
        info!(
            mode = %request.mode,
            frames = total_frames,
            resolution = %sl.resolution(),
            width = start_image.width,
            height = start_image.height,
            "morph started"
        );
        self.active = Some(active);
        self.state = TimelineState::Running;
        self.t = 0.0;
        self.frames_emitted = 0;
        Ok(())
    }

    /// Render, present and advance one frame. Returns the state afterwards.
    ///
    /// Any failure aborts the morph: the sink is finished as cancelled and
    /// the error is returned.
    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> MorphResult<TimelineState> {
        let Some(active) = self.active.as_ref() else {
            return Err(MorphError::InvalidState(format!(
                "cannot tick a timeline in state {:?}",
                self.state
            )));
        };

        let frame = active.next_frame;
        let t = active.time_of(frame);
        match render_and_present(active, frame, t, sink) {
            Ok(()) => {}
            Err(e) => {
                error!(frame = frame + 1, t, error = %e, "morph aborted");
                if let Err(finish_err) = self.finish(MorphOutcome::Cancelled, sink) {
                    warn!(error = %finish_err, "sink failed to finish after abort");
                }
                return Err(e);
            }
        }

        self.t = t;
        self.frames_emitted += 1;
        let done = match self.active.as_mut() {
            Some(active) => {
                active.next_frame += 1;
                active.next_frame >= active.total_frames
            }
            None => true,
        };
        debug!(frame = frame + 1, t, "tick");

        if done {
            self.finish(MorphOutcome::Completed, sink)?;
        }
        Ok(self.state)
    }

    /// Stop a running morph between ticks without emitting further frames.
    pub fn cancel(&mut self, sink: &mut dyn FrameSink) -> MorphResult<()> {
        if self.state != TimelineState::Running {
            return Err(MorphError::InvalidState(format!(
                "cannot cancel a timeline in state {:?}",
                self.state
            )));
        }
        warn!(frames = self.frames_emitted, "morph cancelled");
        self.finish(MorphOutcome::Cancelled, sink)
    }

    /// Drive every remaining tick back to back, without a clock.
    ///
    /// Returns the number of frames emitted.
    pub fn run_to_completion(&mut self, sink: &mut dyn FrameSink) -> MorphResult<u32> {
        while self.is_running() {
            self.tick(sink)?;
        }
        Ok(self.frames_emitted)
    }

    /// Drive the remaining ticks at the ticker's rate. `should_cancel` is
    /// polled at every tick boundary.
    pub fn run_realtime(
        &mut self,
        sink: &mut dyn FrameSink,
        ticker: &mut Ticker,
        mut should_cancel: impl FnMut(&MorphTimeline) -> bool,
    ) -> MorphResult<u32> {
        while self.is_running() {
            ticker.wait();
            if should_cancel(self) {
                self.cancel(sink)?;
                break;
            }
            self.tick(sink)?;
        }
        Ok(self.frames_emitted)
    }

    fn finish(&mut self, outcome: MorphOutcome, sink: &mut dyn FrameSink) -> MorphResult<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        self.state = match outcome {
            MorphOutcome::Completed => TimelineState::Completed,
            MorphOutcome::Cancelled => TimelineState::Cancelled,
        };
        if outcome == MorphOutcome::Completed {
            info!(frames = self.frames_emitted, mode = %active.mode, "morph completed");
        }
        sink.finish(outcome, &active.start_image)
    }
}

fn render_and_present(
    active: &ActiveMorph,
    frame: u32,
    t: f64,
    sink: &mut dyn FrameSink,
) -> MorphResult<()> {
    let lattice = Lattice::interpolate(&active.start_lattice, &active.end_lattice, t)?;
    let intermediate = Mesh::build(&lattice);
    let meshes = FrameMeshes {
        start: &active.start_mesh,
        end: &active.end_mesh,
        intermediate: &intermediate,
    };
    let buffer = compose_frame(&active.start_image, &active.end_image, meshes, t)?;
    sink.present(&MorphFrame {
        index: frame + 1,
        total: active.total_frames,
        t,
        buffer: &buffer,
        lattice: &lattice,
    })
}

/// Fixed-interval clock for real-time preview.
///
/// [`Ticker::wait`] sleeps until the next deadline. A caller that falls
/// behind is not made to catch up with a burst of ticks.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(frames_per_second: u32) -> Self {
        let interval = Duration::from_secs(1) / frames_per_second.max(1);
        Self {
            interval,
            next: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
        self.next = self.next.max(now) + self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmorph_core::lattice::LatticeResolution;
    use meshmorph_core::sink::FrameCollector;
    use meshmorph_core::{Color, Point};

    struct Fixture {
        start_image: FrameBuffer,
        end_image: FrameBuffer,
        start: Lattice,
        end: Lattice,
    }

    fn fixture() -> Fixture {
        let start = Lattice::new(40, 30, LatticeResolution::Five);
        let mut end = start.clone();
        end.set_point(2, 2, Point::new(22, 17)).unwrap();
        Fixture {
            start_image: FrameBuffer::solid(40, 30, &Color::RED),
            end_image: FrameBuffer::solid(40, 30, &Color::BLUE),
            start,
            end,
        }
    }

    fn request(f: &Fixture) -> MorphRequest<'_> {
        MorphRequest {
            start_image: Some(&f.start_image),
            end_image: Some(&f.end_image),
            start_lattice: &f.start,
            end_lattice: &f.end,
            duration_seconds: 1,
            frames_per_second: 4,
            mode: MorphMode::Preview,
            drag_in_progress: false,
        }
    }

    #[test]
    fn test_missing_image_leaves_idle() {
        let f = fixture();
        let mut timeline = MorphTimeline::new();
        let err = timeline
            .start(MorphRequest {
                end_image: None,
                ..request(&f)
            })
            .unwrap_err();
        assert!(matches!(err, MorphError::MissingImage { ref role } if role == "end"));
        assert_eq!(timeline.state(), TimelineState::Idle);
    }

    #[test]
    fn test_resolution_mismatch_rejected() {
        let f = fixture();
        let other = Lattice::new(40, 30, LatticeResolution::Ten);
        let mut timeline = MorphTimeline::new();
        let err = timeline
            .start(MorphRequest {
                end_lattice: &other,
                ..request(&f)
            })
            .unwrap_err();
        assert!(matches!(err, MorphError::ResolutionMismatch { start: 5, end: 10 }));
        assert_eq!(timeline.state(), TimelineState::Idle);
    }

    #[test]
    fn test_refused_during_drag_and_while_running() {
        let f = fixture();
        let mut timeline = MorphTimeline::new();
        assert!(timeline
            .start(MorphRequest {
                drag_in_progress: true,
                ..request(&f)
            })
            .is_err());
        timeline.start(request(&f)).unwrap();
        assert!(matches!(
            timeline.start(request(&f)),
            Err(MorphError::InvalidState(_))
        ));
    }

    #[test]
    fn test_frame_times_end_at_one() {
        let f = fixture();
        let mut timeline = MorphTimeline::new();
        timeline.start(request(&f)).unwrap();
        let mut sink = FrameCollector::new();
        assert_eq!(timeline.run_to_completion(&mut sink).unwrap(), 4);
        assert_eq!(sink.times, vec![0.0, 0.25, 0.5, 1.0]);
        assert_eq!(sink.lattices[0], f.start);
        assert_eq!(sink.lattices[3], f.end);
        assert_eq!(sink.frames[0], f.start_image);
        assert_eq!(sink.frames[3], f.end_image);
        assert_eq!(sink.outcome, Some(MorphOutcome::Completed));
        assert_eq!(timeline.state(), TimelineState::Completed);
        assert_eq!(timeline.progress_percent(), 100);
    }

    #[test]
    fn test_start_captures_lattices_by_value() {
        let mut f = fixture();
        let mut timeline = MorphTimeline::new();
        timeline.start(request(&f)).unwrap();
        f.end.reset();
        let mut sink = FrameCollector::new();
        timeline.run_to_completion(&mut sink).unwrap();
        assert_eq!(sink.lattices[3].point(2, 2), Point::new(22, 17));
    }

    #[test]
    fn test_cancel_between_ticks() {
        let f = fixture();
        let mut timeline = MorphTimeline::new();
        let mut sink = FrameCollector::new();
        timeline.start(request(&f)).unwrap();
        assert_eq!(timeline.tick(&mut sink).unwrap(), TimelineState::Running);
        timeline.cancel(&mut sink).unwrap();
        assert_eq!(timeline.state(), TimelineState::Cancelled);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.outcome, Some(MorphOutcome::Cancelled));
        assert!(timeline.tick(&mut sink).is_err());
        assert!(timeline.cancel(&mut sink).is_err());
        // A cancelled timeline can start again.
        timeline.start(request(&f)).unwrap();
        assert!(timeline.is_running());
    }

    #[test]
    fn test_sink_failure_aborts() {
        struct Failing(u32);
        impl FrameSink for Failing {
            fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
                if frame.index == 2 {
                    return Err(MorphError::Encode("disk full".into()));
                }
                self.0 += 1;
                Ok(())
            }
        }

        let f = fixture();
        let mut timeline = MorphTimeline::new();
        timeline.start(request(&f)).unwrap();
        let mut sink = Failing(0);
        let err = timeline.run_to_completion(&mut sink).unwrap_err();
        assert!(matches!(err, MorphError::Encode(_)));
        assert_eq!(sink.0, 1);
        assert_eq!(timeline.state(), TimelineState::Cancelled);
    }

    #[test]
    fn test_undersized_image_rejected_before_start() {
        for (w, h, resolution) in [(16, 16, LatticeResolution::Twenty), (200, 8, LatticeResolution::Ten)] {
            let image = FrameBuffer::solid(w, h, &Color::RED);
            let lattice = Lattice::new(w, h, resolution);
            let mut timeline = MorphTimeline::new();
            let err = timeline
                .start(MorphRequest {
                    start_image: Some(&image),
                    end_image: Some(&image),
                    start_lattice: &lattice,
                    end_lattice: &lattice,
                    duration_seconds: 1,
                    frames_per_second: 4,
                    mode: MorphMode::Preview,
                    drag_in_progress: false,
                })
                .unwrap_err();
            assert!(matches!(err, MorphError::InvalidArgument(_)), "{}x{}", w, h);
            assert_eq!(timeline.state(), TimelineState::Idle);
        }
    }

    #[test]
    fn test_collapsed_lattice_rejected_before_start() {
        let f = fixture();
        let mut collapsed = f.end.clone();
        // Onto the first top border vertex.
        collapsed.set_point(0, 0, Point::new(6, 0)).unwrap();
        let mut timeline = MorphTimeline::new();
        let err = timeline
            .start(MorphRequest {
                end_lattice: &collapsed,
                ..request(&f)
            })
            .unwrap_err();
        assert!(matches!(err, MorphError::InvalidArgument(_)));
        assert_eq!(timeline.state(), TimelineState::Idle);
    }

    #[test]
    fn test_frame_count_overflow_rejected() {
        let f = fixture();
        let mut timeline = MorphTimeline::new();
        let err = timeline
            .start(MorphRequest {
                frames_per_second: u32::MAX / 2,
                duration_seconds: 15,
                ..request(&f)
            })
            .unwrap_err();
        assert!(matches!(err, MorphError::InvalidArgument(_)));
        assert_eq!(timeline.state(), TimelineState::Idle);
    }

    #[test]
    fn test_abort_keeps_render_error_over_finish_error() {
        struct Broken;
        impl FrameSink for Broken {
            fn present(&mut self, _frame: &MorphFrame<'_>) -> MorphResult<()> {
                Err(MorphError::Encode("disk full".into()))
            }

            fn finish(&mut self, _outcome: MorphOutcome, _start: &FrameBuffer) -> MorphResult<()> {
                Err(MorphError::InvalidState("display gone".into()))
            }
        }

        let f = fixture();
        let mut timeline = MorphTimeline::new();
        timeline.start(request(&f)).unwrap();
        let err = timeline.tick(&mut Broken).unwrap_err();
        assert!(matches!(err, MorphError::Encode(_)));
        assert_eq!(timeline.state(), TimelineState::Cancelled);
    }

    #[test]
    fn test_run_realtime_cancels_at_boundary() {
        let f = fixture();
        let mut timeline = MorphTimeline::new();
        timeline.start(request(&f)).unwrap();
        let mut sink = FrameCollector::new();
        let mut ticker = Ticker::new(1000);
        let frames = timeline
            .run_realtime(&mut sink, &mut ticker, |tl| tl.frames_emitted() == 2)
            .unwrap();
        assert_eq!(frames, 2);
        assert_eq!(timeline.state(), TimelineState::Cancelled);
    }

    #[test]
    fn test_ticker_interval() {
        let ticker = Ticker::new(30);
        assert_eq!(ticker.interval(), Duration::from_secs(1) / 30);
    }
}
