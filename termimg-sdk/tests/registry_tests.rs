// ABOUTME: End-to-end tests driving backends obtained from the registry
// ABOUTME: Uses a scripted terminal so protocol handshakes run without a real tty

use std::sync::Arc;
use tempfile::TempDir;
use termimg_sdk::kitty::TransferMode;
use termimg_sdk::test_helpers::{RecordingHost, ScriptedTerm};
use termimg_sdk::{
    BackendContext, BackendKind, CellArea, CellSize, DisplayRequest, DisplaySettings, Displayer,
    FixedGeometry, ImageDisplayer, Registry,
};

const STREAM_ONLY_REPLY: &[u8] = b"\x1b_Gi=1;EBADF:remote\x1b\\\x1b[?62;22c";
const OK_REPLY: &[u8] = b"\x1b_Gi=1;OK\x1b\\";

fn scripted_registry(term: &ScriptedTerm, host: Arc<RecordingHost>) -> Registry {
    let handle = term.clone();
    let ctx = BackendContext::new(DisplaySettings::default())
        .with_term("xterm-kitty")
        .with_geometry(Arc::new(FixedGeometry::from_cell_size(
            120,
            40,
            CellSize::new(8, 16),
        )))
        .with_host(host)
        .with_terminal(move || Box::new(handle.clone()));
    Registry::with_defaults(ctx)
}

fn header_values(output: &str, key: &str) -> Vec<String> {
    output
        .split("\x1b_G")
        .skip(1)
        .filter_map(|frame| frame.split(';').next())
        .flat_map(|header| header.split(','))
        .filter_map(|pair| pair.strip_prefix(&format!("{}=", key)).map(str::to_string))
        .collect()
}

#[test]
fn test_kitty_scales_large_image_into_cell_box() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    image::RgbImage::from_pixel(400, 300, image::Rgb([10, 20, 30]))
        .save(&path)
        .unwrap();

    let term = ScriptedTerm::new();
    let host = Arc::new(RecordingHost::new());
    let registry = scripted_registry(&term, host.clone());
    let mut kitty = registry.get("kitty");

    term.push_input(STREAM_ONLY_REPLY);
    term.push_input(OK_REPLY);
    // 10x10 cells of 8x16 px: box 80x160, scale 0.2
    kitty
        .draw(&DisplayRequest::new(&path, CellArea::new(0, 0, 10, 10)))
        .unwrap();

    let output = term.output_string();
    assert_eq!(header_values(&output, "s").last().unwrap(), "80");
    assert_eq!(header_values(&output, "v").last().unwrap(), "60");

    let Displayer::Kitty(inner) = &kitty else {
        panic!("expected kitty backend, got {:?}", kitty);
    };
    assert_eq!(inner.transfer_mode(), Some(&TransferMode::Stream));
}

#[test]
fn test_kitty_ids_increase_and_never_go_negative() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("icon.png");
    image::RgbaImage::new(16, 16).save(&path).unwrap();

    let term = ScriptedTerm::new();
    let host = Arc::new(RecordingHost::new());
    let registry = scripted_registry(&term, host.clone());
    let mut kitty = registry.get("kitty");
    let request = DisplayRequest::new(&path, CellArea::new(3, 3, 4, 4));

    term.push_input(STREAM_ONLY_REPLY);
    for _ in 0..3 {
        term.push_input(OK_REPLY);
        kitty.draw(&request).unwrap();
    }

    let output = term.take_output();
    let text = String::from_utf8_lossy(&output);
    // the handshake query also carries i=1
    let ids: Vec<u32> = header_values(&text, "i")
        .iter()
        .skip(1)
        .map(|id| id.parse().unwrap())
        .collect();
    // 16x16 RGBA fits one fragment, so each draw contributes exactly one id
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(ids, vec![1, 2, 3]);
    // transparency survives: 32 bits per pixel
    assert_eq!(header_values(&text, "f").last().unwrap(), "32");

    for _ in 0..5 {
        kitty.clear(request.area).unwrap();
    }
    assert_eq!(host.redraws(), 5);
    let deletes = header_values(&term.output_string(), "i");
    assert_eq!(deletes, vec!["3", "2", "1", "0", "0"]);
}

#[test]
fn test_negotiation_failure_stops_io() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.png");
    image::RgbImage::new(8, 8).save(&path).unwrap();

    let term = ScriptedTerm::new();
    let registry = scripted_registry(&term, Arc::new(RecordingHost::new()));
    let mut kitty = registry.get(BackendKind::Kitty.key());

    term.push_input(b"\x1b[?62;c");
    let err = kitty
        .draw(&DisplayRequest::new(&path, CellArea::new(0, 0, 4, 4)))
        .unwrap_err();
    assert!(err.is_permanent());

    let written = term.take_output();
    kitty.clear(CellArea::new(0, 0, 4, 4)).unwrap();
    kitty.quit().unwrap();
    assert!(!written.is_empty());
    assert!(term.output().is_empty());
}

#[test]
fn test_passive_backends_share_the_interface() {
    let term = ScriptedTerm::new();
    let host = Arc::new(RecordingHost::new());
    let registry = scripted_registry(&term, host.clone());

    for key in ["iterm2", "terminology", "sixel"] {
        let mut displayer = registry.get(key);
        displayer.clear(CellArea::new(0, 0, 10, 10)).unwrap();
        displayer.quit().unwrap();
    }
    // clear + quit each request a repaint
    assert_eq!(host.redraws(), 6);
    assert!(term.output().is_empty());

    let mut sixel = registry.get("sixel");
    assert_eq!(sixel.invalidate_source(std::path::Path::new("/nonexistent")), 0);
}
