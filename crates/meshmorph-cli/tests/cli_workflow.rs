use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_meshmorph")
}

fn workdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("meshmorph_cli_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let output = Command::new(bin())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to spawn meshmorph");
    assert!(
        output.status.success(),
        "meshmorph {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

/// Writes a start and an end PNG and creates `morph.json` over them.
fn init_project(dir: &Path) {
    image::RgbaImage::from_pixel(60, 40, image::Rgba([200, 40, 40, 255]))
        .save(dir.join("start.png"))
        .unwrap();
    image::RgbaImage::from_pixel(30, 20, image::Rgba([40, 40, 200, 255]))
        .save(dir.join("end.png"))
        .unwrap();
    run(
        dir,
        &[
            "init",
            "morph.json",
            "--start",
            "start.png",
            "--end",
            "end.png",
            "--resolution",
            "5",
        ],
    );
}

fn end_point(dir: &Path, index: usize) -> (i64, i64) {
    let text = std::fs::read_to_string(dir.join("morph.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let p = &json["end_points"][index];
    (p["x"].as_i64().unwrap(), p["y"].as_i64().unwrap())
}

#[test]
fn test_info_prints_version() {
    let dir = workdir("info");
    let output = run(&dir, &["info"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "{}", stdout);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_init_drag_export() {
    let dir = workdir("export");
    init_project(&dir);

    // 60x40 at N=5: point (2,2) starts at (30,20).
    assert_eq!(end_point(&dir, 12), (30, 20));
    run(
        &dir,
        &["drag", "morph.json", "--image", "end", "--point", "2,2", "--to", "33,22"],
    );
    assert_eq!(end_point(&dir, 12), (33, 22));

    run(
        &dir,
        &["--fps", "4", "--duration", "1", "export", "morph.json", "--out-dir", "frames"],
    );
    for n in 1..=4 {
        assert!(dir.join(format!("frames/image-{}.jpg", n)).exists(), "missing frame {}", n);
    }
    assert!(!dir.join("frames/image-5.jpg").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_folding_drag_is_ignored() {
    let dir = workdir("fold");
    init_project(&dir);
    let before = std::fs::read_to_string(dir.join("morph.json")).unwrap();

    // Onto the neighbouring control point (2,3) at (40,20).
    run(
        &dir,
        &["drag", "morph.json", "--image", "end", "--point", "2,2", "--to", "40,20"],
    );
    let after = std::fs::read_to_string(dir.join("morph.json")).unwrap();
    assert_eq!(before, after);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_preview_and_overlay_write_png() {
    let dir = workdir("preview");
    init_project(&dir);

    run(
        &dir,
        &["--fps", "2", "--duration", "1", "preview", "morph.json", "-o", "last.png"],
    );
    let last = image::open(dir.join("last.png")).unwrap().to_rgba8();
    assert_eq!(last.dimensions(), (60, 40));
    assert_eq!(last.get_pixel(30, 20).0, [40, 40, 200, 255]);

    run(
        &dir,
        &["overlay", "morph.json", "--image", "start", "-o", "overlay.png"],
    );
    let overlay = image::open(dir.join("overlay.png")).unwrap().to_rgba8();
    assert_eq!(overlay.dimensions(), (60, 40));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_export_mode_preview_persists_frames() {
    let dir = workdir("export_mode");
    init_project(&dir);
    std::fs::write(dir.join("meshmorph.toml"), "export_dir = \"kept\"\n").unwrap();

    run(&dir, &["--fps", "2", "--duration", "1", "preview", "morph.json"]);
    assert!(!dir.join("kept").exists());

    run(&dir, &["set", "morph.json", "--export-mode", "true"]);
    run(&dir, &["--fps", "2", "--duration", "1", "preview", "morph.json"]);
    assert!(dir.join("kept/image-1.jpg").exists());
    assert!(dir.join("kept/image-2.jpg").exists());
    assert!(!dir.join("kept/image-3.jpg").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_image_too_small_for_lattice_is_refused() {
    let dir = workdir("tiny");
    image::RgbaImage::from_pixel(16, 16, image::Rgba([10, 10, 10, 255]))
        .save(dir.join("tiny.png"))
        .unwrap();
    let output = Command::new(bin())
        .current_dir(&dir)
        .args([
            "init",
            "morph.json",
            "--start",
            "tiny.png",
            "--end",
            "tiny.png",
            "--resolution",
            "20",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!dir.join("morph.json").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_excessive_fps_is_refused() {
    let dir = workdir("fps");
    let output = Command::new(bin())
        .current_dir(&dir)
        .args(["--fps", "2147483647", "info"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let _ = std::fs::remove_dir_all(&dir);
}
