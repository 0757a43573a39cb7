// End-to-end tests: CLI invocation through extracted images and report.json.
//
// All test PDFs are generated with lopdf (no committed fixtures).

use std::io::Write;
use std::path::Path;
use std::process::Command;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, Stream, dictionary};

// ============================================================
// Helpers
// ============================================================

/// Build a Command pointing to the compiled binary.
fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pdf_figures"))
}

/// FlateDecode RGB image XObject whose pixels are derived from `seed`.
fn image_xobject(doc: &mut Document, seed: u8) -> lopdf::ObjectId {
    let pixels: Vec<u8> = (0..8 * 8 * 3).map(|i: u32| (i as u8).wrapping_mul(seed)).collect();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&pixels).unwrap();

    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 8,
            "Height" => 8,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        encoder.finish().unwrap(),
    ))
}

/// Create a 2-page manual (600x800 points).
///
/// Page 1: heading "1.1 / Introduction" and one figure.
/// Page 2: heading "1.2 / Setup" and two figures, plus a footer with the
/// manual name.
fn create_manual_pdf(path: &Path) {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let body_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let page_specs: [(&[u8], &[u8]); 2] = [
        (
            b"BT /F1 14 Tf 50 700 Td (1.1) Tj 0 -20 Td (Introduction) Tj ET\n\
              q 200 0 0 200 100 400 cm /Im1 Do Q",
            b"Im1",
        ),
        (
            b"BT /F1 14 Tf 50 700 Td (1.2) Tj 0 -20 Td (Setup) Tj ET\n\
              BT /F2 8 Tf 50 30 Td (PROCSG02 Rev 3) Tj ET\n\
              q 200 0 0 150 100 450 cm /Im1 Do Q\n\
              q 200 0 0 150 100 250 cm /Im2 Do Q",
            b"Im1 Im2",
        ),
    ];

    let mut kids: Vec<Object> = Vec::new();
    let mut seed = 3u8;
    for (content, names) in page_specs {
        let mut xobjects = lopdf::Dictionary::new();
        for name in names.split(|b| *b == b' ') {
            xobjects.set(name.to_vec(), image_xobject(&mut doc, seed));
            seed += 2;
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(600),
                Object::Integer(800),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id, "F2" => body_font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(2),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).unwrap();
}

/// Write a jobs.yaml file with one job and optional extra keys.
fn write_jobs_yaml(dir: &Path, input: &str, output: &str, extra: &str) {
    let content = format!("jobs:\n  - input: {input}\n    output: {output}\n{extra}");
    std::fs::write(dir.join("jobs.yaml"), content).unwrap();
}

fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================
// 1. Extraction
// ============================================================

#[test]
fn test_e2e_extracts_named_figures() {
    let dir = tempfile::tempdir().unwrap();
    create_manual_pdf(&dir.path().join("manual.pdf"));
    write_jobs_yaml(dir.path(), "manual.pdf", "out", "    manual: MAN\n");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out_dir = dir.path().join("out");
    assert_eq!(
        sorted_file_names(&out_dir),
        vec![
            "CRL-MAN-1.1.png",
            "CRL-MAN-1.2 n_1.png",
            "CRL-MAN-1.2 n_2.png",
            "report.json",
        ]
    );

    let png = std::fs::read(out_dir.join("CRL-MAN-1.1.png")).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}

#[test]
fn test_e2e_report_contents() {
    let dir = tempfile::tempdir().unwrap();
    create_manual_pdf(&dir.path().join("manual.pdf"));
    write_jobs_yaml(dir.path(), "manual.pdf", "out", "");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = std::fs::read_to_string(dir.path().join("out").join("report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();

    // manual name deduced from the page footer
    assert_eq!(report["manual"], "PROCSG02");
    assert_eq!(report["page_count"], 2);
    assert_eq!(report["sections"].as_array().unwrap().len(), 2);
    assert_eq!(report["sections"][1]["number"], "1.2");

    let images = report["images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    assert!(images.iter().all(|i| i["status"] == "accepted"));
    assert_eq!(images[0]["filename"], "CRL-PROCSG02-1.1.png");
    assert_eq!(images[1]["section"], "1.2");
    assert_eq!(images[0]["image_type"], "photo");
    assert_eq!(report["preview"], false);
}

#[test]
fn test_e2e_page_selection() {
    let dir = tempfile::tempdir().unwrap();
    create_manual_pdf(&dir.path().join("manual.pdf"));
    write_jobs_yaml(
        dir.path(),
        "manual.pdf",
        "out",
        "    manual: MAN\n    pages: \"2\"\n",
    );

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        sorted_file_names(&dir.path().join("out")),
        vec!["CRL-MAN-1.2 n_1.png", "CRL-MAN-1.2 n_2.png", "report.json"]
    );
}

#[test]
fn test_e2e_settings_yaml_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    create_manual_pdf(&dir.path().join("manual.pdf"));
    std::fs::write(dir.path().join("settings.yaml"), "prefix: DOC\n").unwrap();
    write_jobs_yaml(dir.path(), "manual.pdf", "out", "    manual: MAN\n");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(dir.path().join("out").join("DOC-MAN-1.1.png").exists());
}

#[test]
fn test_e2e_preview_writes_only_report() {
    let dir = tempfile::tempdir().unwrap();
    create_manual_pdf(&dir.path().join("manual.pdf"));
    write_jobs_yaml(
        dir.path(),
        "manual.pdf",
        "out",
        "    manual: MAN\n    preview: true\n",
    );

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("PREVIEW"));

    let out_dir = dir.path().join("out");
    assert_eq!(sorted_file_names(&out_dir), vec!["report.json"]);

    let report = std::fs::read_to_string(out_dir.join("report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["preview"], true);
    let planned: Vec<&str> = report["images"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["filename"].as_str())
        .collect();
    assert_eq!(
        planned,
        vec!["CRL-MAN-1.1.png", "CRL-MAN-1.2 n_1.png", "CRL-MAN-1.2 n_2.png"]
    );
}

// ============================================================
// 2. Failures
// ============================================================

#[test]
fn test_e2e_missing_input_fails_job() {
    let dir = tempfile::tempdir().unwrap();
    write_jobs_yaml(dir.path(), "absent.pdf", "out", "");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR"));
}

#[test]
fn test_e2e_page_out_of_range_fails_job() {
    let dir = tempfile::tempdir().unwrap();
    create_manual_pdf(&dir.path().join("manual.pdf"));
    write_jobs_yaml(dir.path(), "manual.pdf", "out", "    pages: \"5\"\n");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}
