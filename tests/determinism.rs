use std::path::Path;
use std::process::Command;

use chrono::{FixedOffset, TimeZone};
use serde_json::Value;
use tempfile::tempdir;

use fakechat::capture::{Capture, ExportFormat, Region};
use fakechat::fonts::sha256_hex;
use fakechat::platform::{Appearance, Platform};
use fakechat::raster::RasterCapture;
use fakechat::session::{DisplaySettings, FixedClock, Participant, Session};
use fakechat::script::ParseMode;

const SCRIPT: &str = "> hey, are we still on for tonight?\n< yes! (19:05)\n< bringing snacks\n> perfect\n";

fn render_hash(script: &str, display: DisplaySettings) -> String {
    let now = FixedOffset::east_opt(3600)
        .expect("valid offset")
        .with_ymd_and_hms(2024, 3, 9, 18, 0, 0)
        .single()
        .expect("valid timestamp");
    let session = Session::new(
        FixedClock(now),
        ParseMode::Carry,
        Participant::named("Alice"),
        Participant::named("Bob"),
        display,
    )
    .with_script(script);
    let view = session.view();

    let mut capture = RasterCapture::new(1.0, None).expect("valid scale");
    let image = capture
        .capture_region(&view, Region::for_view(&view))
        .expect("capture should succeed");
    let png = image.encode(ExportFormat::Png).expect("png should encode");
    sha256_hex(&png)
}

#[test]
fn determinism_same_script_same_pixels() {
    let display = DisplaySettings::default();
    assert_eq!(
        render_hash(SCRIPT, display),
        render_hash(SCRIPT, display),
        "identical inputs should encode to identical png bytes"
    );
}

#[test]
fn determinism_mobile_dark_is_stable() {
    let display = DisplaySettings {
        platform: Platform::Instagram,
        appearance: Appearance::Dark,
        mobile: true,
        ..DisplaySettings::default()
    };
    assert_eq!(render_hash(SCRIPT, display), render_hash(SCRIPT, display));
}

#[test]
fn determinism_visual_inputs_change_output() {
    let light = DisplaySettings::default();
    let dark = DisplaySettings {
        appearance: Appearance::Dark,
        ..light
    };
    let instagram = DisplaySettings {
        platform: Platform::Instagram,
        ..light
    };

    let base = render_hash(SCRIPT, light);
    assert_ne!(base, render_hash(SCRIPT, dark));
    assert_ne!(base, render_hash(SCRIPT, instagram));
    assert_ne!(base, render_hash("> something else entirely\n", light));
}

fn export_sha(cwd: &Path, name: &str) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_fakechat"))
        .current_dir(cwd)
        .env("HOME", cwd)
        .env("XDG_CONFIG_HOME", cwd.join(".config"))
        .env("APPDATA", cwd.join("AppData"))
        .args([
            "export",
            "chat.txt",
            "--now",
            "2024-03-09T18:00:00+01:00",
            "--scale",
            "1",
            "-o",
            name,
            "--json",
        ])
        .output()
        .expect("fakechat command should run");
    assert!(output.status.success(), "export should succeed: {output:?}");
    let summary: Value = serde_json::from_slice(&output.stdout).expect("summary json");
    let sha = summary["sha256"].as_str().expect("sha256 string").to_owned();
    let bytes = std::fs::read(cwd.join(name)).expect("export should exist");
    assert_eq!(sha, sha256_hex(&bytes), "summary hash should match file bytes");
    sha
}

#[test]
fn determinism_cli_exports_hash_identically() {
    let dir = tempdir().expect("tempdir should create");
    std::fs::write(dir.path().join("chat.txt"), SCRIPT).expect("script should write");

    let first = export_sha(dir.path(), "a.png");
    let second = export_sha(dir.path(), "b.png");
    assert_eq!(first, second);
}
