use std::path::PathBuf;

fn write_bmp(path: &std::path::Path, w: u32, h: u32, rgb: [u8; 3]) {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb(rgb));
    img.save_with_format(path, image::ImageFormat::Bmp).unwrap();
}

fn espstack_exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_espstack")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "espstack.exe"
            } else {
                "espstack"
            });
            p
        })
}

#[test]
fn cli_composites_a_folder_and_writes_report() {
    let in_dir = PathBuf::from("target").join("cli_smoke").join("in");
    let out_dir = PathBuf::from("target").join("cli_smoke").join("out");
    let _ = std::fs::remove_dir_all(in_dir.parent().unwrap());
    std::fs::create_dir_all(&in_dir).unwrap();

    write_bmp(&in_dir.join("vtx1.bmp"), 16, 16, [200, 0, 0]);
    write_bmp(&in_dir.join("bone1.bmp"), 12, 12, [255, 255, 255]);
    write_bmp(&in_dir.join("vtx3.bmp"), 16, 16, [0, 200, 0]);
    write_bmp(&in_dir.join("bone3.bmp"), 16, 16, [0, 0, 200]);
    write_bmp(&in_dir.join("minmax.bmp"), 8, 8, [255, 255, 255]);

    let report_path = out_dir.join("report.json");
    let status = std::process::Command::new(espstack_exe())
        .arg("--in")
        .arg(&in_dir)
        .arg("--out")
        .arg(&out_dir)
        .arg("--report-json")
        .arg(&report_path)
        .status()
        .unwrap();

    assert!(status.success());
    assert!(out_dir.join("ESP1.png").exists());
    assert!(out_dir.join("ESP3.png").exists());

    let report: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(&report_path).unwrap()).unwrap();
    let entries = report["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["index"], 1);
    assert_eq!(entries[0]["outcome"], "ok");
    assert_eq!(entries[1]["index"], 3);
    assert_eq!(report["policy"]["use_multiply_blend"], true);

    // opaque white bone over red base with multiply: base survives intact
    let esp1 = image::open(out_dir.join("ESP1.png")).unwrap().to_rgba8();
    assert_eq!(esp1.dimensions(), (16, 16));
    assert_eq!(esp1.get_pixel(4, 4).0, [200, 0, 0, 255]);
}

#[test]
fn cli_fails_cleanly_without_legend() {
    let in_dir = PathBuf::from("target").join("cli_smoke_no_legend");
    let _ = std::fs::remove_dir_all(&in_dir);
    std::fs::create_dir_all(&in_dir).unwrap();

    write_bmp(&in_dir.join("vtx1.bmp"), 4, 4, [1, 2, 3]);
    write_bmp(&in_dir.join("bone1.bmp"), 4, 4, [4, 5, 6]);

    let output = std::process::Command::new(espstack_exe())
        .arg("--in")
        .arg(&in_dir)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing required asset"));
    assert!(!in_dir.join("ESP1.png").exists());
}
