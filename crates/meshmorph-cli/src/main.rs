mod args;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use meshmorph_core::hash::ContentHash;
use meshmorph_core::sink::{FrameSink, HashingSink};
use meshmorph_core::{
    Color, ColorRole, EditorSettings, ImageRole, Lattice, LatticeEditor, LatticeResolution, Mesh,
    MorphConfig, Point, Project, SettingChange, CONFIG_FILE_NAME,
};
use meshmorph_encode::{ApngSink, JpegSequenceWriter};
use meshmorph_render::image_loader::{load_image, save_png};
use meshmorph_render::overlay::draw_overlay;
use meshmorph_render::{MorphMode, MorphSession, PreviewDisplay, Ticker, TimelineState};

#[derive(Parser)]
#[command(
    name = "meshmorph",
    version,
    about = "Meshmorph: mesh-based image morphing",
    long_about = "Meshmorph morphs one image into another by warping both along a\ncontrol lattice and cross-dissolving the results frame by frame."
)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Override frames per second
    #[arg(long, global = true)]
    fps: Option<u32>,

    /// Override the morph duration in seconds (1-15)
    #[arg(long, global = true)]
    duration: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project from a start and an end image
    Init {
        /// Project file to write
        #[arg()]
        project: PathBuf,

        /// Start image
        #[arg(long)]
        start: PathBuf,

        /// End image (rescaled to the start image's dimensions)
        #[arg(long)]
        end: PathBuf,

        /// Lattice resolution: 5, 10 or 20
        #[arg(long)]
        resolution: Option<LatticeResolution>,

        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },

    /// Move one control point, refusing moves that would fold the mesh
    Drag {
        #[arg()]
        project: PathBuf,

        /// Which lattice to edit: start or end
        #[arg(long)]
        image: ImageRole,

        /// Control point as row,col
        #[arg(long, value_parser = args::parse_index)]
        point: (usize, usize),

        /// Target position as x,y
        #[arg(long, value_parser = args::parse_point, allow_hyphen_values = true)]
        to: Point,
    },

    /// Change editor settings stored in a project
    Set {
        #[arg()]
        project: PathBuf,

        /// Lattice resolution (resets both lattices)
        #[arg(long)]
        resolution: Option<LatticeResolution>,

        /// Morph duration in seconds
        #[arg(long = "morph-duration")]
        morph_duration: Option<u32>,

        /// Brightness as start=<level> or end=<level>, level in -100..=100
        #[arg(long, value_parser = args::parse_brightness, allow_hyphen_values = true)]
        brightness: Vec<(ImageRole, i32)>,

        /// Overlay color as <role>=<name|#hex>
        #[arg(long, value_parser = args::parse_color_assignment)]
        color: Vec<(ColorRole, Color)>,

        /// Draw triangle edges in overlays
        #[arg(long)]
        show_lattice: Option<bool>,

        /// Draw control point handles in overlays
        #[arg(long)]
        show_control_points: Option<bool>,

        /// Export frames when a morph runs
        #[arg(long)]
        export_mode: Option<bool>,
    },

    /// Render an image with its lattice drawn on top
    Overlay {
        #[arg()]
        project: PathBuf,

        /// Which image: start or end
        #[arg(long)]
        image: ImageRole,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Highlight the triangles around row,col
        #[arg(long, value_parser = args::parse_index)]
        highlight: Option<(usize, usize)>,
    },

    /// Play the morph; frames are also written when export mode is on
    Preview {
        #[arg()]
        project: PathBuf,

        /// Pace frames at the configured frame rate
        #[arg(long)]
        realtime: bool,

        /// Cancel after this many frames
        #[arg(long)]
        stop_after: Option<u32>,

        /// Save the last morph frame shown as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the morph and write every frame as image-<n>.jpg
    Export {
        #[arg()]
        project: PathBuf,

        /// Output directory (default: export_dir from the config)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// JPEG quality 1-100
        #[arg(long)]
        quality: Option<u8>,

        /// Also write the whole morph as an animated PNG
        #[arg(long)]
        apng: Option<PathBuf>,

        /// Cancel after this many frames
        #[arg(long)]
        stop_after: Option<u32>,
    },

    /// Show engine, configuration and project information
    Info {
        #[arg()]
        project: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Init {
            project,
            start,
            end,
            resolution,
            force,
        } => cmd_init(&project, &start, &end, resolution, force, &config),
        Commands::Drag {
            project,
            image,
            point,
            to,
        } => cmd_drag(&project, image, point, to),
        Commands::Set {
            project,
            resolution,
            morph_duration,
            brightness,
            color,
            show_lattice,
            show_control_points,
            export_mode,
        } => {
            let mut changes = Vec::new();
            changes.extend(resolution.map(SettingChange::ResolutionChanged));
            changes.extend(morph_duration.map(SettingChange::DurationChanged));
            changes.extend(
                brightness
                    .into_iter()
                    .map(|(role, level)| SettingChange::BrightnessChanged(role, level)),
            );
            changes.extend(
                color
                    .into_iter()
                    .map(|(role, c)| SettingChange::ColorChanged(role, c)),
            );
            changes.extend(show_lattice.map(SettingChange::ShowLattice));
            changes.extend(show_control_points.map(SettingChange::ShowControlPoints));
            changes.extend(export_mode.map(SettingChange::ExportModeChanged));
            cmd_set(&project, changes)
        }
        Commands::Overlay {
            project,
            image,
            output,
            highlight,
        } => cmd_overlay(&project, image, &output, highlight, &config, cli.duration),
        Commands::Preview {
            project,
            realtime,
            stop_after,
            output,
        } => cmd_preview(&project, realtime, stop_after, output, &config, cli.duration),
        Commands::Export {
            project,
            out_dir,
            quality,
            apng,
            stop_after,
        } => cmd_export(
            &project,
            out_dir,
            quality,
            apng,
            stop_after,
            &config,
            cli.duration,
        ),
        Commands::Info { project, json } => cmd_info(project.as_deref(), json, &config),
    }
}

/// Best-effort config load with the global flags applied on top.
fn load_config(cli: &Cli) -> Result<MorphConfig> {
    let mut config = MorphConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config: {}", cli.config.display()))?;
    if let Some(fps) = cli.fps {
        config.frames_per_second = fps;
    }
    if let Some(duration) = cli.duration {
        config.duration_seconds = duration;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_project(path: &Path) -> Result<Project> {
    Project::load(path).with_context(|| format!("failed to load project: {}", path.display()))
}

/// Rebuild the editing session a project describes.
fn open_session(path: &Path, config: &MorphConfig, duration: Option<u32>) -> Result<MorphSession> {
    let mut project = load_project(path)?;
    args::resolve_image_paths(&mut project, path);
    let mut session = MorphSession::from_project(&project)
        .with_context(|| format!("failed to open project images for {}", path.display()))?;
    session.set_frames_per_second(config.frames_per_second);
    if let Some(seconds) = duration {
        session.apply_setting(SettingChange::DurationChanged(seconds))?;
    }
    Ok(session)
}

fn cmd_init(
    project_path: &Path,
    start: &Path,
    end: &Path,
    resolution: Option<LatticeResolution>,
    force: bool,
    config: &MorphConfig,
) -> Result<()> {
    if project_path.exists() && !force {
        anyhow::bail!(
            "'{}' already exists (use --force to overwrite)",
            project_path.display()
        );
    }

    let start_image = load_image(start)
        .with_context(|| format!("failed to load start image: {}", start.display()))?;
    let end_image =
        load_image(end).with_context(|| format!("failed to load end image: {}", end.display()))?;

    let settings = EditorSettings {
        resolution: resolution.unwrap_or(config.lattice_resolution),
        duration_seconds: config.duration_seconds,
        export_mode: config.export_mode,
        ..EditorSettings::default()
    };
    let mut session = MorphSession::new(start_image.width, start_image.height, settings);
    session.set_image(ImageRole::Start, &start_image)?;
    session.set_image(ImageRole::End, &end_image)?;

    let start_ref = args::project_relative(start, project_path);
    let end_ref = args::project_relative(end, project_path);
    let project = session.to_project(Some(&start_ref), Some(&end_ref))?;
    project
        .save(project_path)
        .with_context(|| format!("failed to write project: {}", project_path.display()))?;

    println!("✅ Created morph project {}", project_path.display());
    println!(
        "   Images:     {}x{} (start was {}x{})",
        session.width(),
        session.height(),
        start_image.width,
        start_image.height
    );
    println!("   Lattice:    {}", project.resolution());
    println!("   Duration:   {}s", project.settings.duration_seconds);
    println!();
    println!("Next steps:");
    println!(
        "  meshmorph drag {} --image end --point 2,2 --to X,Y",
        project_path.display()
    );
    println!("  meshmorph export {}", project_path.display());
    Ok(())
}

fn cmd_drag(path: &Path, role: ImageRole, (row, col): (usize, usize), to: Point) -> Result<()> {
    let mut project = load_project(path)?;
    let (start, end) = project.lattices()?;
    let mut lattice = match role {
        ImageRole::Start => start,
        ImageRole::End => end,
    };
    if row >= lattice.n() || col >= lattice.n() {
        anyhow::bail!(
            "control point ({}, {}) is outside the {} lattice",
            row,
            col,
            lattice.resolution()
        );
    }

    let from = lattice.point(row, col);
    if !LatticeEditor::try_move(&mut lattice, row, col, to)? {
        warn!(%role, row, col, %to, "move would fold the mesh");
        println!(
            "⚠️  Move of {} point ({}, {}) from {} to {} rejected; lattice unchanged",
            role, row, col, from, to
        );
        return Ok(());
    }

    project.store_lattice(role, &lattice)?;
    project.save(path)?;
    println!(
        "✓ Moved {} point ({}, {}) from {} to {}",
        role, row, col, from, to
    );
    Ok(())
}

fn cmd_set(path: &Path, changes: Vec<SettingChange>) -> Result<()> {
    if changes.is_empty() {
        anyhow::bail!("nothing to change; pass at least one setting flag");
    }
    let mut project = load_project(path)?;
    for change in changes {
        let label = format!("{:?}", change);
        if project.settings.apply(change)? {
            // A new resolution invalidates both lattices.
            project.reset_lattices();
            println!("   ✓ {} (lattices reset)", label);
        } else {
            println!("   ✓ {}", label);
        }
    }
    project.validate().context("settings not applied")?;
    project.save(path)?;
    Ok(())
}

fn cmd_overlay(
    path: &Path,
    role: ImageRole,
    output: &Path,
    highlight: Option<(usize, usize)>,
    config: &MorphConfig,
    duration: Option<u32>,
) -> Result<()> {
    let session = open_session(path, config, duration)?;
    let mut frame = session
        .image(role)
        .ok_or_else(|| anyhow::anyhow!("project has no {} image", role))?;
    draw_overlay(&mut frame, session.lattice(role), session.settings(), highlight);
    save_png(&frame, output)?;
    println!("✓ Wrote {} overlay to {}", role, output.display());
    Ok(())
}

/// Run a morph to the end, or cancel it once `stop_after` frames were shown.
fn drive(
    session: &mut MorphSession,
    mode: MorphMode,
    sink: &mut dyn FrameSink,
    realtime: Option<u32>,
    stop_after: Option<u32>,
) -> Result<u32> {
    let limit_reached = |frames: u32| stop_after.is_some_and(|n| frames >= n);

    if let Some(fps) = realtime {
        let mut ticker = Ticker::new(fps);
        let frames = session.run_morph_realtime(mode, sink, &mut ticker, |timeline| {
            limit_reached(timeline.frames_emitted())
        })?;
        return Ok(frames);
    }

    session.start_morph(mode)?;
    while session.state() == TimelineState::Running {
        if limit_reached(session.timeline().frames_emitted()) {
            session.cancel(sink)?;
            break;
        }
        session.tick(sink)?;
    }
    Ok(session.timeline().frames_emitted())
}

fn report_run(session: &MorphSession, frames: u32, hash: Option<ContentHash>, started: Instant) {
    let state = session.state();
    let icon = if state == TimelineState::Completed { "✅" } else { "⏹️ " };
    println!("{} Morph {:?} after {} frame(s)", icon, state, frames);
    println!(
        "   {}x{}, {}, {:.2}s",
        session.width(),
        session.height(),
        session.lattice(ImageRole::Start).resolution(),
        started.elapsed().as_secs_f64()
    );
    if let Some(hash) = hash {
        println!("   Sequence hash: {}", hash.to_hex());
    }
}

fn cmd_preview(
    path: &Path,
    realtime: bool,
    stop_after: Option<u32>,
    output: Option<PathBuf>,
    config: &MorphConfig,
    duration: Option<u32>,
) -> Result<()> {
    let mut session = open_session(path, config, duration)?;
    let mut display = PreviewDisplay::new();
    let mut hashing = HashingSink::new();
    let started = Instant::now();

    let mode = session.configured_mode();
    let pace = realtime.then_some(config.frames_per_second);
    let frames = match mode {
        MorphMode::Export => {
            let dir = &config.export_dir;
            let mut writer = JpegSequenceWriter::new(dir, config.jpeg_quality, config.background)
                .with_context(|| format!("failed to prepare export directory: {}", dir.display()))?;
            info!(dir = %dir.display(), "export mode on, persisting preview frames");
            let frames = drive(
                &mut session,
                mode,
                &mut ((&mut display, &mut hashing), &mut writer),
                pace,
                stop_after,
            )?;
            println!("   Frames:     {}", dir.display());
            frames
        }
        MorphMode::Preview => drive(
            &mut session,
            mode,
            &mut (&mut display, &mut hashing),
            pace,
            stop_after,
        )?,
    };
    report_run(&session, frames, Some(hashing.finish_hash()), started);

    if let Some(output) = output {
        let frame = display
            .last_frame()
            .ok_or_else(|| anyhow::anyhow!("no frame was shown"))?;
        save_png(frame, &output)?;
        println!("   Last frame: {}", output.display());
    }
    Ok(())
}

fn cmd_export(
    path: &Path,
    out_dir: Option<PathBuf>,
    quality: Option<u8>,
    apng: Option<PathBuf>,
    stop_after: Option<u32>,
    config: &MorphConfig,
    duration: Option<u32>,
) -> Result<()> {
    let mut session = open_session(path, config, duration)?;
    let dir = out_dir.unwrap_or_else(|| config.export_dir.clone());
    let mut writer = JpegSequenceWriter::new(
        &dir,
        quality.unwrap_or(config.jpeg_quality),
        config.background,
    )
    .with_context(|| format!("failed to prepare export directory: {}", dir.display()))?;
    let mut hashing = HashingSink::new();
    let started = Instant::now();

    info!(dir = %dir.display(), "exporting frames");
    let frames = match &apng {
        Some(apng_path) => {
            let mut apng_sink = ApngSink::new(apng_path, config.frames_per_second);
            drive(
                &mut session,
                MorphMode::Export,
                &mut ((&mut writer, &mut hashing), &mut apng_sink),
                None,
                stop_after,
            )?
        }
        None => drive(
            &mut session,
            MorphMode::Export,
            &mut (&mut writer, &mut hashing),
            None,
            stop_after,
        )?,
    };

    report_run(&session, frames, Some(hashing.finish_hash()), started);
    println!(
        "   Frames:     {} (image-1.jpg … image-{}.jpg)",
        dir.display(),
        frames
    );
    if let Some(apng_path) = apng {
        if session.state() == TimelineState::Completed {
            println!("   APNG:       {}", apng_path.display());
        }
    }
    Ok(())
}

fn cmd_info(project: Option<&Path>, json: bool, config: &MorphConfig) -> Result<()> {
    let summary = match project {
        Some(path) => Some(project_summary(path, config)?),
        None => None,
    };

    if json {
        let value = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "config": config,
            "project": summary,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("🔀 Meshmorph");
    println!("   Version:    {}", env!("CARGO_PKG_VERSION"));
    println!("   Warp:       piecewise affine, bicubic (Catmull-Rom)");
    println!("   Output:     image-<n>.jpg sequence, animated PNG");
    println!();
    println!("   Config:");
    println!("   ├ duration   {}s", config.duration_seconds);
    println!("   ├ fps        {}", config.frames_per_second);
    println!("   ├ lattice    {}", config.lattice_resolution);
    println!("   ├ export dir {}", config.export_dir.display());
    println!("   └ quality    {}", config.jpeg_quality);

    if let Some(summary) = summary {
        println!();
        println!("   Project:");
        println!("   ├ size       {}x{}", summary.width, summary.height);
        println!("   ├ lattice    {}", summary.resolution);
        println!(
            "   ├ morph      {}s, {} frames",
            summary.duration_seconds, summary.total_frames
        );
        println!(
            "   ├ edited     {} start, {} end point(s)",
            summary.moved_start, summary.moved_end
        );
        println!(
            "   └ fold-free  {}",
            if summary.fold_free { "yes" } else { "NO" }
        );
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct ProjectSummary {
    width: u32,
    height: u32,
    resolution: LatticeResolution,
    duration_seconds: u32,
    total_frames: u32,
    moved_start: usize,
    moved_end: usize,
    fold_free: bool,
}

fn project_summary(path: &Path, config: &MorphConfig) -> Result<ProjectSummary> {
    let project = load_project(path)?;
    let (start, end) = project.lattices()?;
    let default = Lattice::new(project.width, project.height, project.resolution());
    let moved = |lattice: &Lattice| {
        lattice
            .points()
            .iter()
            .zip(default.points())
            .filter(|(a, b)| a != b)
            .count()
    };
    Ok(ProjectSummary {
        width: project.width,
        height: project.height,
        resolution: project.resolution(),
        duration_seconds: project.settings.duration_seconds,
        total_frames: project.settings.duration_seconds * config.frames_per_second,
        moved_start: moved(&start),
        moved_end: moved(&end),
        fold_free: Mesh::build(&start).is_fold_free() && Mesh::build(&end).is_fold_free(),
    })
}
