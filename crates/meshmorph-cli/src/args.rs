//! Small argument parsers and path helpers shared by the subcommands.

use std::path::{Path, PathBuf};

use meshmorph_core::{Color, ColorRole, ImageRole, Point, Project};

/// Parse `"a,b"` into two trimmed fields.
fn split_pair(s: &str) -> Result<(&str, &str), String> {
    s.split_once(',')
        .map(|(a, b)| (a.trim(), b.trim()))
        .ok_or_else(|| format!("expected two comma-separated values, got '{}'", s))
}

/// `"row,col"` of a control point.
pub fn parse_index(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = split_pair(s)?;
    let row = a.parse().map_err(|_| format!("invalid row '{}'", a))?;
    let col = b.parse().map_err(|_| format!("invalid column '{}'", b))?;
    Ok((row, col))
}

/// `"x,y"` pixel position.
pub fn parse_point(s: &str) -> Result<Point, String> {
    let (a, b) = split_pair(s)?;
    let x = a.parse().map_err(|_| format!("invalid x '{}'", a))?;
    let y = b.parse().map_err(|_| format!("invalid y '{}'", b))?;
    Ok(Point::new(x, y))
}

/// `"start=20"` or `"end=-35"`.
pub fn parse_brightness(s: &str) -> Result<(ImageRole, i32), String> {
    let (role, level) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <start|end>=<level>, got '{}'", s))?;
    let role: ImageRole = role.parse().map_err(|e| format!("{}", e))?;
    let level = level
        .trim()
        .parse()
        .map_err(|_| format!("invalid brightness level '{}'", level))?;
    Ok((role, level))
}

/// `"primary_lattice=blue"` or `"highlight_control_point=#ff8800"`.
pub fn parse_color_assignment(s: &str) -> Result<(ColorRole, Color), String> {
    let (role, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <role>=<color>, got '{}'", s))?;
    let role = match role.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "primary_control_point" => ColorRole::PrimaryControlPoint,
        "highlight_control_point" => ColorRole::HighlightControlPoint,
        "primary_lattice" => ColorRole::PrimaryLattice,
        "highlight_lattice" => ColorRole::HighlightLattice,
        other => return Err(format!("unknown color role '{}'", other)),
    };
    let value = value.trim();
    let color = if value.starts_with('#') {
        Color::from_hex(value)
    } else {
        Color::from_name(value)
    }
    .map_err(|e| e.to_string())?;
    Ok((role, color))
}

/// Resolve the project's relative image paths against the project file's
/// directory so commands work from any working directory.
pub fn resolve_image_paths(project: &mut Project, project_file: &Path) {
    let base = project_file.parent().unwrap_or(Path::new("."));
    for role in [ImageRole::Start, ImageRole::End] {
        let resolved = project
            .image_path(role)
            .filter(|p| p.is_relative())
            .map(|p| base.join(p));
        if let Some(path) = resolved {
            project.set_image_path(role, Some(path));
        }
    }
}

/// Store `image` relative to the project directory when it lives beneath
/// it, otherwise as an absolute path.
pub fn project_relative(image: &Path, project_file: &Path) -> PathBuf {
    let base = project_file.parent().unwrap_or(Path::new(""));
    if base.as_os_str().is_empty() {
        return image.to_path_buf();
    }
    match image.strip_prefix(base) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) if image.is_absolute() => image.to_path_buf(),
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(image))
            .unwrap_or_else(|_| image.to_path_buf()),
    }
}
