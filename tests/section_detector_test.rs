// セクション検出と位置検索のテスト

use pdf_figures::analysis::pattern::PatternSet;
use pdf_figures::analysis::section_detector::{SectionDetector, SectionIndex};
use pdf_figures::config::settings::Settings;
use pdf_figures::error::FigureError;
use pdf_figures::model::{BBox, Section, SectionRef, TextLine};

fn line(text: &str, y: f64, size: f64, bold: bool) -> TextLine {
    TextLine::new(text, BBox::new(50.0, y, 250.0, y + size), size, bold)
}

fn detect(settings: &Settings, lines: &[TextLine]) -> Vec<Section> {
    let patterns = PatternSet::compile(&settings.section_patterns).unwrap();
    SectionDetector::new(settings, &patterns)
        .detect_page(0, lines)
        .unwrap()
}

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

// ============================================================
// 1. ペア検出
// ============================================================

#[test]
fn test_detects_number_title_pair() {
    let lines = vec![
        line("1.1", 100.0, 14.0, true),
        line("Introduction", 120.0, 14.0, true),
    ];
    let sections = detect(&Settings::default(), &lines);

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].number, "1.1");
    assert_eq!(sections[0].title, "Introduction");
    assert_eq!(sections[0].page, 0);
    assert_eq!(sections[0].position_y, 100.0);
    assert_eq!(sections[0].pattern_index, 0);
    assert!((sections[0].confidence - 1.0).abs() < 1e-9);
}

#[test]
fn test_rejects_non_bold_when_required() {
    let lines = vec![
        line("1.1", 100.0, 14.0, true),
        line("Introduction", 120.0, 14.0, false),
    ];
    assert!(detect(&Settings::default(), &lines).is_empty());

    let relaxed = Settings {
        bold_required: false,
        ..Settings::default()
    };
    assert_eq!(detect(&relaxed, &lines).len(), 1);
}

#[test]
fn test_rejects_font_size_outside_range() {
    let lines = vec![
        line("2", 100.0, 20.0, true),
        line("Installation", 120.0, 20.0, true),
    ];
    assert!(detect(&Settings::default(), &lines).is_empty());
}

#[test]
fn test_font_size_range_is_inclusive_after_rounding() {
    let lines = vec![
        line("2", 100.0, 16.04, true),
        line("Installation", 120.0, 11.96, true),
    ];
    assert_eq!(detect(&Settings::default(), &lines).len(), 1);
}

#[test]
fn test_rejects_short_title() {
    let lines = vec![line("3", 100.0, 14.0, true), line("Use", 120.0, 14.0, true)];
    assert!(detect(&Settings::default(), &lines).is_empty());
}

#[test]
fn test_rejects_title_without_alpha_run() {
    let lines = vec![
        line("3", 100.0, 14.0, true),
        line("12-34-56", 120.0, 14.0, true),
    ];
    assert!(detect(&Settings::default(), &lines).is_empty());
}

#[test]
fn test_title_line_is_not_reused_as_number() {
    // "4" / "5.1" / "Wiring" : "5.1" はタイトルとして不適格なので窓は1つ進み、
    // "5.1" / "Wiring" が一致する
    let lines = vec![
        line("4", 100.0, 14.0, true),
        line("5.1", 120.0, 14.0, true),
        line("Wiring", 140.0, 14.0, true),
    ];
    let sections = detect(&Settings::default(), &lines);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].number, "5.1");
}

#[test]
fn test_consumed_pair_advances_by_two() {
    // "6" / "7 Overview" が一致すると "7 Overview" は次の番号候補にならない
    let settings = Settings {
        section_patterns: vec![r"^\d+".to_string()],
        ..Settings::default()
    };
    let lines = vec![
        line("6", 100.0, 14.0, true),
        line("7 Overview", 120.0, 14.0, true),
        line("Maintenance", 140.0, 14.0, true),
    ];
    let sections = detect(&settings, &lines);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].number, "6");
}

#[test]
fn test_first_matching_pattern_wins() {
    let settings = Settings {
        section_patterns: vec![r"^[A-Z]+\d+".to_string(), r"^\w+".to_string()],
        ..Settings::default()
    };
    let lines = vec![
        line("AB12", 100.0, 14.0, true),
        line("Appendix", 120.0, 14.0, true),
    ];
    let sections = detect(&settings, &lines);
    assert_eq!(sections[0].pattern_index, 0);

    let lines = vec![
        line("ab12", 100.0, 14.0, true),
        line("Appendix", 120.0, 14.0, true),
    ];
    let sections = detect(&settings, &lines);
    assert_eq!(sections[0].pattern_index, 1);
    assert!(sections[0].confidence < 1.0);
}

#[test]
fn test_match_must_start_at_line_start() {
    let lines = vec![
        line("see 1.2", 100.0, 14.0, true),
        line("Something", 120.0, 14.0, true),
    ];
    assert!(detect(&Settings::default(), &lines).is_empty());
}

#[test]
fn test_empty_page_yields_no_sections() {
    assert!(detect(&Settings::default(), &[]).is_empty());
}

#[test]
fn test_malformed_geometry_is_section_detection_error() {
    let settings = Settings::default();
    let patterns = PatternSet::compile(&settings.section_patterns).unwrap();
    let mut bad = line("1", 100.0, 14.0, true);
    bad.bbox = BBox::new(50.0, f64::NAN, 250.0, 114.0);

    let err = SectionDetector::new(&settings, &patterns)
        .detect_page(3, &[bad, line("Overview", 120.0, 14.0, true)])
        .unwrap_err();
    assert!(matches!(err, FigureError::SectionDetectionError(_)));
}

#[test]
fn test_invalid_pattern_is_config_error() {
    let err = PatternSet::compile(&["(unclosed"]).unwrap_err();
    assert!(matches!(err, FigureError::ConfigError(_)));
}

// ============================================================
// 2. SectionIndex: 順序と位置検索
// ============================================================

#[test]
fn test_index_orders_by_page_then_position() {
    let index = SectionIndex::new(vec![
        section("2.1", 1, 50.0),
        section("1.2", 0, 300.0),
        section("1.1", 0, 100.0),
    ]);
    let numbers: Vec<&str> = index.sections().iter().map(|s| s.number.as_str()).collect();
    assert_eq!(numbers, vec!["1.1", "1.2", "2.1"]);
}

#[test]
fn test_index_drops_duplicate_keys() {
    let index = SectionIndex::new(vec![section("1.1", 0, 100.0), section("9.9", 0, 100.0)]);
    assert_eq!(index.sections().len(), 1);
    assert_eq!(index.sections()[0].number, "1.1");
}

#[test]
fn test_lookup_returns_closest_preceding_on_same_page() {
    let index = SectionIndex::new(vec![section("1.1", 2, 100.0), section("1.2", 2, 300.0)]);
    let found = index.find_section_for_position(2, 250.0);
    assert_eq!(index.get(found).unwrap().number, "1.1");

    let found = index.find_section_for_position(2, 350.0);
    assert_eq!(index.get(found).unwrap().number, "1.2");
}

#[test]
fn test_lookup_falls_back_to_last_section_of_earlier_page() {
    let index = SectionIndex::new(vec![
        section("1", 0, 100.0),
        section("1.1", 0, 500.0),
        section("2", 2, 100.0),
        section("2.1", 2, 300.0),
    ]);
    let found = index.find_section_for_position(2, 50.0);
    assert_eq!(index.get(found).unwrap().number, "1.1");
}

#[test]
fn test_lookup_returns_sentinel_when_nothing_precedes() {
    let index = SectionIndex::new(vec![section("1.1", 2, 100.0), section("1.2", 2, 300.0)]);
    assert_eq!(index.find_section_for_position(2, 50.0), SectionRef::Unassigned);
    assert_eq!(index.find_section_for_position(0, 500.0), SectionRef::Unassigned);
}

#[test]
fn test_lookup_position_equal_to_section_is_not_preceding() {
    let index = SectionIndex::new(vec![section("1.1", 0, 100.0)]);
    assert_eq!(index.find_section_for_position(0, 100.0), SectionRef::Unassigned);
}
