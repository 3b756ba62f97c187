//! Integration tests for the watermark removal pipeline

mod common;

use common::{page_count, page_widths, write_pdf, TestPage};
use pdf_dewatermark::pdf::{merge_pdfs, MergeOptions};
use pdf_dewatermark::{Error, Pipeline, ProcessOptions, Result, ScanReporter, WatermarkConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn no_compress() -> ProcessOptions {
    ProcessOptions {
        compress: false,
        ..ProcessOptions::default()
    }
}

/// Single-page file carrying a scanner text banner
fn text_watermarked(dir: &Path, name: &str) -> PathBuf {
    write_pdf(
        dir,
        name,
        vec![TestPage::blank(600.0, 800.0)
            .text(72.0, 700.0, "Meeting notes")
            .text(300.0, 40.0, "已使用CamScanner扫描")],
    )
}

/// Single-page file with a 90x90 stamp anchored at (85%, ~88%) of the page
fn qr_stamped(dir: &Path, name: &str) -> PathBuf {
    write_pdf(
        dir,
        name,
        vec![TestPage::blank(600.0, 800.0).image(510.0, 10.0, 90.0, 90.0)],
    )
}

fn plain(dir: &Path, name: &str, widths: &[f32]) -> PathBuf {
    let pages = widths.iter().map(|&w| TestPage::blank(w, 800.0)).collect();
    write_pdf(dir, name, pages)
}

#[test]
fn test_text_and_qr_scenario() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = text_watermarked(temp_dir.path(), "a.pdf");
    let b = qr_stamped(temp_dir.path(), "b.pdf");

    let output = Pipeline::default()
        .process(&[&a, &b], &no_compress())
        .expect("Failed to process PDFs");

    assert_eq!(output.path, temp_dir.path().join("a_merged.pdf"));
    assert_eq!(page_count(&output.path), 2);
    assert_eq!(output.stats.pages, 2);
    assert_eq!(output.stats.files, 2);
    assert!(output.stats.watermarks >= 2, "got {} watermarks", output.stats.watermarks);
    assert!(output.stats.size_mb >= 0.0);

    // inputs are untouched, per-file intermediates are gone
    assert!(a.exists() && b.exists());
    assert!(!temp_dir.path().join("a_clean.pdf").exists());
    assert!(!temp_dir.path().join("b_clean.pdf").exists());
}

#[test]
fn test_disabled_detection_counts_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = text_watermarked(temp_dir.path(), "a.pdf");
    let b = qr_stamped(temp_dir.path(), "b.pdf");

    let options = ProcessOptions {
        remove_text: false,
        remove_qr: false,
        ..no_compress()
    };
    let output = Pipeline::default().process(&[&a, &b], &options).unwrap();
    assert_eq!(output.stats.watermarks, 0);
    assert_eq!(output.stats.pages, 2);
}

#[test]
fn test_merge_preserves_order_and_count() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = plain(temp_dir.path(), "a.pdf", &[600.0, 601.0]);
    let b = plain(temp_dir.path(), "b.pdf", &[500.0, 501.0, 502.0]);

    let output = Pipeline::default().process(&[&a, &b], &no_compress()).unwrap();

    assert_eq!(output.stats.pages, 5);
    assert_eq!(output.stats.pages, page_count(&output.path));
    assert_eq!(page_widths(&output.path), vec![600.0, 601.0, 500.0, 501.0, 502.0]);
}

#[test]
fn test_banner_drawn_in_pieces_is_detected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    // "Created" at 10pt is estimated at 35pt wide, so the second piece continues the line
    let split = write_pdf(
        temp_dir.path(),
        "split.pdf",
        vec![TestPage::blank(600.0, 800.0)
            .text(300.0, 20.0, "Created")
            .text(335.0, 20.0, " by Acme")],
    );

    let options = ProcessOptions {
        remove_qr: false,
        merge: false,
        ..no_compress()
    };
    let output = Pipeline::default().process(&[&split], &options).unwrap();
    assert_eq!(output.stats.watermarks, 1);

    let report = ScanReporter::default().scan(&split).unwrap();
    assert!(report.has_text_watermark);
}

#[test]
fn test_merge_pdfs_directly() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = plain(temp_dir.path(), "a.pdf", &[600.0, 601.0]);
    let b = plain(temp_dir.path(), "b.pdf", &[500.0, 501.0, 502.0]);
    let output_path = temp_dir.path().join("merged.pdf");

    let pages = merge_pdfs(&MergeOptions {
        input_paths: vec![b.clone(), a.clone()],
        output_path: output_path.clone(),
    })
    .expect("Failed to merge PDFs");

    assert_eq!(pages, 5);
    assert_eq!(page_widths(&output_path), vec![500.0, 501.0, 502.0, 600.0, 601.0]);
}

#[test]
fn test_merge_nonexistent_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let options = MergeOptions {
        input_paths: vec![PathBuf::from("nonexistent.pdf")],
        output_path: temp_dir.path().join("output.pdf"),
    };

    let result = merge_pdfs(&options);
    assert!(matches!(result, Err(Error::FileNotFound(_))));
}

#[test]
fn test_no_merge_processes_first_file_only() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = plain(temp_dir.path(), "a.pdf", &[600.0, 600.0]);
    let b = plain(temp_dir.path(), "b.pdf", &[600.0, 600.0, 600.0]);
    let c = plain(temp_dir.path(), "c.pdf", &[600.0]);

    let options = ProcessOptions {
        merge: false,
        ..ProcessOptions::default()
    };
    let output = Pipeline::default().process(&[&a, &b, &c], &options).unwrap();

    assert_eq!(output.path, temp_dir.path().join("a_clean.pdf"));
    assert_eq!(output.stats.files, 3);
    assert_eq!(output.stats.pages, 2);
    assert!(!temp_dir.path().join("b_clean.pdf").exists());
    assert!(!temp_dir.path().join("c_clean.pdf").exists());
}

#[test]
fn test_compression_failure_falls_back() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = text_watermarked(temp_dir.path(), "a.pdf");
    let b = qr_stamped(temp_dir.path(), "b.pdf");

    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let failing = move |input: &Path, output: &Path| -> Result<()> {
        *recorder.lock().unwrap() = std::fs::read(input)?;
        // leave a partial file behind before failing
        std::fs::write(output, b"%PDF-partial")?;
        Err(Error::CompressionUnavailable("forced failure".to_string()))
    };

    let pipeline = Pipeline::default().with_compressor(Box::new(failing));
    let output = pipeline
        .process(&[&a, &b], &ProcessOptions::default())
        .expect("Compression failure must not fail the run");

    assert_eq!(output.path, temp_dir.path().join("a_merged.pdf"));
    let content = std::fs::read(&output.path).unwrap();
    assert!(!content.is_empty());
    assert_eq!(content, *seen.lock().unwrap());
    assert!(!temp_dir.path().join("a_merged_compressed.pdf").exists());
    assert_eq!(output.stats.pages, 2);
}

#[test]
fn test_missing_ghostscript_falls_back() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = plain(temp_dir.path(), "a.pdf", &[600.0]);

    let gs = pdf_dewatermark::pdf::Ghostscript::new("/nonexistent/gs-for-tests");
    let pipeline = Pipeline::default().with_compressor(Box::new(gs));
    let output = pipeline.process(&[&a], &ProcessOptions::default()).unwrap();

    assert_eq!(output.path, temp_dir.path().join("a_clean.pdf"));
    assert!(output.path.exists());
}

#[test]
fn test_invalid_inputs() {
    let empty: Vec<PathBuf> = Vec::new();
    let result = Pipeline::default().process(&empty, &ProcessOptions::default());
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let result = Pipeline::default().process(&["notes.docx"], &ProcessOptions::default());
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_corrupt_document() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let broken = temp_dir.path().join("broken.pdf");
    std::fs::write(&broken, b"this is not a pdf").unwrap();

    let result = Pipeline::default().process(&[&broken], &no_compress());
    let err = result.expect_err("corrupt input must fail");
    assert!(err.is_corrupt_document(), "unexpected error: {}", err);
}

#[test]
fn test_redaction_is_idempotent_on_page_count() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = text_watermarked(temp_dir.path(), "a.pdf");

    let options = ProcessOptions {
        merge: false,
        ..no_compress()
    };
    let first = Pipeline::default().process(&[&a], &options).unwrap();
    let second = Pipeline::default().process(&[&first.path], &options).unwrap();

    assert_eq!(second.path, temp_dir.path().join("a_clean_clean.pdf"));
    assert_eq!(page_count(&second.path), 1);
    assert_eq!(page_widths(&second.path), page_widths(&a));
    // the banner text is still in the content, only covered
    assert_eq!(second.stats.watermarks, first.stats.watermarks);
}

#[test]
fn test_scan_report() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let a = text_watermarked(temp_dir.path(), "a.pdf");
    let b = qr_stamped(temp_dir.path(), "b.pdf");
    let reporter = ScanReporter::new(&WatermarkConfig::default());

    let report = reporter.scan(&a).expect("Failed to scan");
    assert_eq!(report.pages, 1);
    assert!(report.has_text_watermark);
    assert!(!report.has_qr_watermark);
    let samples: Vec<&str> = report.text_samples.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(samples, vec!["Meeting notes", "已使用CamScanner扫描"]);

    let report = reporter.scan(&b).expect("Failed to scan");
    assert_eq!(report.images, 1);
    assert!(report.has_qr_watermark);
    assert!(!report.has_text_watermark);
    assert_eq!(report.image_samples[0].size_label(), "90x90");

    // scanning never writes
    assert!(!temp_dir.path().join("a_clean.pdf").exists());
}

#[test]
fn test_config_threshold_override() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let b = qr_stamped(temp_dir.path(), "b.pdf");

    let config = WatermarkConfig::from_json_str(r#"{ "region": { "max_area": 5000.0 } }"#).unwrap();
    let report = ScanReporter::new(&config).scan(&b).unwrap();
    assert!(!report.has_qr_watermark);

    let options = ProcessOptions {
        remove_text: false,
        ..no_compress()
    };
    let output = Pipeline::new(config).process(&[&b], &options).unwrap();
    assert_eq!(output.stats.watermarks, 0);
}
