use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use filecon::batch::{batch_convert, SUCCESS_MESSAGE};
use filecon::category::MediaCategory;
use filecon::config::Config;
use filecon::convert::ConverterRegistry;
use filecon::options::ConversionOptions;

fn write_png(path: &std::path::Path) {
    let img = RgbaImage::from_fn(16, 16, |x, y| Rgba([x as u8 * 16, y as u8 * 16, 128, (x * 16) as u8]));
    img.save(path).unwrap();
}

#[tokio::test]
async fn valid_and_missing_files_yield_two_outcomes_in_order() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("valid.png");
    write_png(input.path());
    let missing = temp.path().join("missing.png");
    let out = temp.child("out");
    out.create_dir_all().unwrap();

    let registry = ConverterRegistry::from_config(&Config::default());
    let files = vec![input.path().to_path_buf(), missing.clone()];

    let outcomes = batch_convert(
        registry.converter(MediaCategory::Images),
        &files,
        out.path(),
        Arc::new(ConversionOptions::new().with_format("JPEG")),
        None,
    )
    .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].message, SUCCESS_MESSAGE);
    assert!(!outcomes[1].success);
    assert_eq!(outcomes[1].file, missing);
    assert!(outcomes[1].message.contains("missing.png"));

    assert!(out.child("valid.jpeg").path().exists());
    let converted = image::open(out.child("valid.jpeg").path()).unwrap();
    assert!(!converted.color().has_alpha());
}

#[tokio::test]
async fn failing_file_does_not_stop_later_files() {
    let temp = TempDir::new().unwrap();
    temp.child("a.txt").write_str("first").unwrap();
    temp.child("b.txt").write_binary(&[0xff, 0xfe, 0x00, 0xd8]).unwrap();
    temp.child("c.md").write_str("# Third\n\n* done").unwrap();
    let out = temp.child("pdf");
    out.create_dir_all().unwrap();

    let registry = ConverterRegistry::from_config(&Config::default());
    let files: Vec<PathBuf> = ["a.txt", "b.txt", "c.md"]
        .iter()
        .map(|name| temp.path().join(name))
        .collect();

    let progress = Mutex::new(Vec::new());
    let sink = |value: f64| progress.lock().unwrap().push(value);

    let outcomes = batch_convert(
        registry.converter(MediaCategory::Documents),
        &files,
        out.path(),
        Arc::new(ConversionOptions::new()),
        Some(&sink),
    )
    .await;

    let flags: Vec<bool> = outcomes.iter().map(|o| o.success).collect();
    assert_eq!(flags, vec![true, false, true]);
    assert!(out.child("a.pdf").path().exists());
    assert!(!out.child("b.pdf").path().exists());
    assert!(out.child("c.pdf").path().exists());

    let progress = progress.lock().unwrap();
    let expected: Vec<f64> = (0..3).map(|i| (i + 1) as f64 / 3.0 * 100.0).collect();
    assert_eq!(*progress, expected);
    assert_eq!(progress.last().copied(), Some(100.0));
}

#[tokio::test]
async fn unsupported_document_pair_is_a_failed_outcome() {
    let temp = TempDir::new().unwrap();
    temp.child("notes.txt").write_str("hello").unwrap();

    let registry = ConverterRegistry::from_config(&Config::default());
    let outcomes = batch_convert(
        registry.converter(MediaCategory::Documents),
        &[temp.path().join("notes.txt")],
        temp.path(),
        Arc::new(ConversionOptions::new().with_format("docx")),
        None,
    )
    .await;

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].message, "Unsupported conversion: .txt to docx");
}

#[tokio::test]
async fn same_directory_same_format_never_deletes_sources() {
    let temp = TempDir::new().unwrap();
    let broken = temp.child("broken.png");
    broken.write_binary(b"not really a png").unwrap();
    let valid = temp.child("valid.png");
    write_png(valid.path());
    let original = std::fs::read(valid.path()).unwrap();

    let registry = ConverterRegistry::from_config(&Config::default());
    let outcomes = batch_convert(
        registry.converter(MediaCategory::Images),
        &[broken.path().to_path_buf(), valid.path().to_path_buf()],
        temp.path(),
        Arc::new(ConversionOptions::new().with_format("PNG")),
        None,
    )
    .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.success));
    assert!(outcomes[0].message.contains("overwrite the input"));
    assert_eq!(std::fs::read(broken.path()).unwrap(), b"not really a png");
    assert_eq!(std::fs::read(valid.path()).unwrap(), original);
}

#[tokio::test]
async fn failed_rerun_keeps_previous_output() {
    let temp = TempDir::new().unwrap();
    let source = temp.child("other.png");
    source.write_binary(b"\x89PNG truncated").unwrap();
    let out = temp.child("out");
    out.create_dir_all().unwrap();
    out.child("other.jpeg").write_binary(b"from an earlier batch").unwrap();

    let registry = ConverterRegistry::from_config(&Config::default());
    let outcomes = batch_convert(
        registry.converter(MediaCategory::Images),
        &[source.path().to_path_buf()],
        out.path(),
        Arc::new(ConversionOptions::new().with_format("JPEG")),
        None,
    )
    .await;

    assert!(!outcomes[0].success);
    assert_eq!(
        std::fs::read(out.child("other.jpeg").path()).unwrap(),
        b"from an earlier batch"
    );
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
}
