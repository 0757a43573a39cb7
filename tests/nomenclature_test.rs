// ファイル名の割り当てとマニュアル名推定のテスト

use pdf_figures::naming::manual_name::{deduce_manual_name, is_plausible_manual_name};
use pdf_figures::naming::nomenclature::{NamingScheme, assign_names};
use pdf_figures::model::{
    BBox, ImageId, ImageRecord, RawImage, RejectionReason, Section, SectionRef, ValidationStatus,
};

fn section(number: &str, page: u32, y: f64) -> Section {
    Section {
        number: number.to_string(),
        title: format!("Title {number}"),
        page,
        position_y: y,
        position_x: 50.0,
        right_x: 250.0,
        confidence: 1.0,
        pattern_index: 0,
    }
}

fn accepted(page: u32, sequence: u32, y: f64, section: SectionRef, format: &str) -> ImageRecord {
    let mut record = ImageRecord::collected(RawImage {
        id: ImageId { page, sequence },
        bbox: BBox::new(100.0, y, 300.0, y + 100.0),
        data: vec![page as u8, sequence as u8],
        format: format.to_string(),
        content_hash: format!("{page}-{sequence}"),
        perceptual_hash: None,
    });
    record.section = section;
    record.status = ValidationStatus::Accepted;
    record
}

fn scheme() -> NamingScheme {
    NamingScheme::new("CRL", "MAN", "0")
}

fn filenames(records: &[ImageRecord], sections: &[Section]) -> Vec<String> {
    assign_names(records, sections, &scheme())
        .into_iter()
        .map(|n| n.filename)
        .collect()
}

// ============================================================
// 1. グループと番号付け
// ============================================================

#[test]
fn test_single_image_has_no_index() {
    let sections = vec![section("1.1", 0, 100.0)];
    let records = vec![accepted(0, 0, 200.0, SectionRef::Detected(0), "png")];
    assert_eq!(filenames(&records, &sections), vec!["CRL-MAN-1.1.png"]);
}

#[test]
fn test_group_is_indexed_in_position_order() {
    let sections = vec![section("1.1", 0, 100.0), section("1.2", 1, 100.0)];
    // 入力順はばらばらでも (page, y) 順に番号が付く
    let records = vec![
        accepted(1, 1, 400.0, SectionRef::Detected(1), "png"),
        accepted(0, 0, 200.0, SectionRef::Detected(0), "png"),
        accepted(1, 0, 200.0, SectionRef::Detected(1), "jpeg"),
    ];
    assert_eq!(
        filenames(&records, &sections),
        vec!["CRL-MAN-1.1.png", "CRL-MAN-1.2 n_1.jpeg", "CRL-MAN-1.2 n_2.png"]
    );
}

#[test]
fn test_unassigned_images_use_label() {
    let sections = vec![section("2", 3, 100.0)];
    let records = vec![
        accepted(0, 0, 200.0, SectionRef::Unassigned, "png"),
        accepted(0, 1, 400.0, SectionRef::Unassigned, "png"),
        accepted(3, 0, 300.0, SectionRef::Detected(0), "png"),
    ];
    assert_eq!(
        filenames(&records, &sections),
        vec!["CRL-MAN-0 n_1.png", "CRL-MAN-0 n_2.png", "CRL-MAN-2.png"]
    );
}

#[test]
fn test_repeated_section_number_shares_one_group() {
    let sections = vec![section("3.1", 0, 100.0), section("3.1", 2, 100.0)];
    let records = vec![
        accepted(0, 0, 200.0, SectionRef::Detected(0), "png"),
        accepted(2, 0, 200.0, SectionRef::Detected(1), "png"),
    ];
    assert_eq!(
        filenames(&records, &sections),
        vec!["CRL-MAN-3.1 n_1.png", "CRL-MAN-3.1 n_2.png"]
    );
}

#[test]
fn test_numbers_equal_after_sanitizing_share_one_group() {
    let sections = vec![section("1/2", 0, 100.0), section("1_2", 1, 100.0)];
    let records = vec![
        accepted(0, 0, 200.0, SectionRef::Detected(0), "png"),
        accepted(1, 0, 200.0, SectionRef::Detected(1), "png"),
    ];
    let names = filenames(&records, &sections);
    assert_eq!(names, vec!["CRL-MAN-1_2 n_1.png", "CRL-MAN-1_2 n_2.png"]);
}

#[test]
fn test_rejected_images_are_not_named() {
    let sections = vec![section("1", 0, 100.0)];
    let mut rejected = accepted(0, 1, 400.0, SectionRef::Detected(0), "png");
    rejected.status = ValidationStatus::Rejected(RejectionReason::Duplicate {
        of: ImageId {
            page: 0,
            sequence: 0,
        },
    });
    let records = vec![accepted(0, 0, 200.0, SectionRef::Detected(0), "png"), rejected];

    let names = assign_names(&records, &sections, &scheme());
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].filename, "CRL-MAN-1.png");
    assert_eq!(names[0].index, None);
}

#[test]
fn test_assignment_is_deterministic() {
    let sections = vec![section("1", 0, 100.0), section("2", 0, 500.0)];
    let records = vec![
        accepted(0, 2, 600.0, SectionRef::Detected(1), "png"),
        accepted(0, 0, 200.0, SectionRef::Detected(0), "png"),
        accepted(0, 1, 300.0, SectionRef::Detected(0), "png"),
    ];
    let first = assign_names(&records, &sections, &scheme());
    let mut reversed = records.clone();
    reversed.reverse();
    let second = assign_names(&reversed, &sections, &scheme());
    assert_eq!(first, second);
}

#[test]
fn test_filename_components_are_sanitized() {
    let scheme = NamingScheme::new("CRL", "AB/CD", "0");
    assert_eq!(scheme.filename("1:2", None, "png"), "CRL-AB_CD-1_2.png");
}

// ============================================================
// 2. マニュアル名の推定
// ============================================================

#[test]
fn test_manual_name_from_footer() {
    let footer = vec!["Copyright 2023 ACME PROCSG02 Rev 3".to_string()];
    assert_eq!(deduce_manual_name(&footer, None, "whatever"), "PROCSG02");
}

#[test]
fn test_manual_name_skips_false_positives() {
    let footer = vec!["PAGE12 of 40".to_string()];
    assert_eq!(
        deduce_manual_name(&footer, Some("Operator Guide XYZ-ABC"), "whatever"),
        "XYZ-ABC"
    );
}

#[test]
fn test_manual_name_from_file_name() {
    assert_eq!(deduce_manual_name(&[], None, "ABC123_manual"), "ABC123");
    assert_eq!(deduce_manual_name(&[], None, "guide-v2"), "guide");
}

#[test]
fn test_manual_name_fallback() {
    assert_eq!(deduce_manual_name(&[], None, "verylongmanualname"), "VERYLONGMA");
    assert_eq!(deduce_manual_name(&[], None, ""), "MANUAL");
}

#[test]
fn test_plausible_manual_names() {
    assert!(is_plausible_manual_name("PROCSG02"));
    assert!(!is_plausible_manual_name("2023"));
    assert!(!is_plausible_manual_name("PAGE1"));
    assert!(!is_plausible_manual_name("REV2"));
    assert!(!is_plausible_manual_name("AB"));
    assert!(!is_plausible_manual_name("abcdef"));
}
