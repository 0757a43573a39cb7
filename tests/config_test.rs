// 設定ファイル解析テスト

use std::io::Write;

use pdf_figures::config::job::{JobFile, parse_page_range};
use pdf_figures::config::load_settings_for_job;
use pdf_figures::config::merged::MergedConfig;
use pdf_figures::config::settings::{MissingBboxPolicy, Settings};
use pdf_figures::error::FigureError;

// ============================================================
// 1. ページ範囲パーサ
// ============================================================

#[test]
fn test_parse_page_range_single_range() {
    let result = parse_page_range("5-10").expect("should parse range");
    assert_eq!(result, vec![5, 6, 7, 8, 9, 10]);
}

#[test]
fn test_parse_page_range_mixed_sorted_dedup() {
    let result = parse_page_range("15, 1, 3, 5-7, 3").expect("should parse mixed");
    assert_eq!(result, vec![1, 3, 5, 6, 7, 15]);
}

#[test]
fn test_parse_page_range_rejects_zero() {
    assert!(parse_page_range("0-3").is_err());
}

#[test]
fn test_parse_page_range_reversed_range() {
    assert!(parse_page_range("10-5").is_err());
}

#[test]
fn test_parse_page_range_invalid_text() {
    assert!(parse_page_range("abc").is_err());
    assert!(parse_page_range("").is_err());
}

// ============================================================
// 2. Settings のデシリアライズとデフォルト値
// ============================================================

#[test]
fn test_settings_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.font_size_range, [12.0, 16.0]);
    assert!(settings.bold_required);
    assert_eq!(settings.title_min_length, 5);
    assert_eq!(settings.section_patterns.len(), 2);
    assert_eq!(settings.max_distance_pixels, 200.0);
    assert_eq!(settings.similarity_threshold, 1.0);
    assert_eq!(settings.missing_bbox, MissingBboxPolicy::Reject);
    assert_eq!(settings.prefix, "CRL");
    assert_eq!(settings.unassigned_label, "0");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_partial_yaml_keeps_defaults() {
    let yaml = r#"
font_size_range: [10.0, 18.0]
bold_required: false
section_patterns:
  - '^Chapter \d+$'
missing_bbox: synthesize
prefix: DOC
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse partial YAML");
    assert_eq!(settings.font_size_range, [10.0, 18.0]);
    assert!(!settings.bold_required);
    assert_eq!(settings.section_patterns, vec![r"^Chapter \d+$".to_string()]);
    assert_eq!(settings.missing_bbox, MissingBboxPolicy::Synthesize);
    assert_eq!(settings.prefix, "DOC");
    // 指定していない値はデフォルト
    assert_eq!(settings.title_min_length, 5);
    assert_eq!(settings.min_width, 50.0);
}

#[test]
fn test_settings_empty_yaml() {
    let settings = Settings::from_yaml("{}").expect("should parse empty mapping");
    assert_eq!(settings.font_size_range, Settings::default().font_size_range);
}

#[test]
fn test_settings_invalid_yaml_is_config_error() {
    let err = Settings::from_yaml("font_size_range: nope").unwrap_err();
    assert!(matches!(err, FigureError::ConfigError(_)));
}

// ============================================================
// 3. Settings::validate
// ============================================================

fn assert_invalid(settings: Settings) {
    let err = settings.validate().unwrap_err();
    assert!(
        matches!(err, FigureError::ConfigError(_)),
        "expected ConfigError, got {err:?}"
    );
}

#[test]
fn test_validate_inverted_font_range() {
    assert_invalid(Settings {
        font_size_range: [16.0, 12.0],
        ..Settings::default()
    });
}

#[test]
fn test_validate_inverted_image_size_range() {
    assert_invalid(Settings {
        min_width: 500.0,
        max_width: 100.0,
        ..Settings::default()
    });
}

#[test]
fn test_validate_inverted_aspect_range() {
    assert_invalid(Settings {
        min_ratio: 5.0,
        max_ratio: 0.5,
        ..Settings::default()
    });
}

#[test]
fn test_validate_bands_cover_page() {
    assert_invalid(Settings {
        header_ratio: 0.5,
        footer_ratio: 0.5,
        ..Settings::default()
    });
}

#[test]
fn test_validate_similarity_out_of_range() {
    assert_invalid(Settings {
        similarity_threshold: 1.5,
        ..Settings::default()
    });
}

#[test]
fn test_validate_empty_patterns() {
    assert_invalid(Settings {
        section_patterns: vec![],
        ..Settings::default()
    });
}

#[test]
fn test_validate_non_positive_distance() {
    assert_invalid(Settings {
        max_distance_pixels: 0.0,
        ..Settings::default()
    });
}

#[test]
fn test_validate_rejects_nan_upper_bounds() {
    assert_invalid(Settings {
        max_ratio: f64::NAN,
        ..Settings::default()
    });
    assert_invalid(Settings {
        max_width: f64::NAN,
        ..Settings::default()
    });
    assert_invalid(Settings {
        max_height: f64::NAN,
        ..Settings::default()
    });
}

#[test]
fn test_validate_rejects_nan_from_yaml() {
    let settings = Settings::from_yaml("max_ratio: .nan\n").unwrap();
    assert!(settings.max_ratio.is_nan());
    assert_invalid(settings);
}

#[test]
fn test_adaptive_settings_default_off_and_validated() {
    let settings = Settings::from_yaml("adaptive_detection: true\nadaptive_min_samples: 5\n").unwrap();
    assert!(settings.adaptive_detection);
    assert_eq!(settings.adaptive_min_samples, 5);
    assert!(!Settings::default().adaptive_detection);

    assert_invalid(Settings {
        adaptive_confidence_threshold: 1.5,
        ..Settings::default()
    });
    assert_invalid(Settings {
        adaptive_match_threshold: f64::NAN,
        ..Settings::default()
    });
    assert_invalid(Settings {
        adaptive_font_tolerance: -1.0,
        ..Settings::default()
    });
}

// ============================================================
// 4. ジョブファイルとマージ
// ============================================================

#[test]
fn test_job_file_parse() {
    let yaml = r#"
jobs:
  - input: manual.pdf
    output: out/
  - input: other.pdf
    output: out2/
    manual: PROCSG02
    prefix: ABC
    pages: "1, 3-4"
    bold_required: false
    font_size_range: [9.0, 20.0]
    preview: true
"#;
    let job_file: JobFile = serde_yml::from_str(yaml).expect("should parse job file");
    assert_eq!(job_file.jobs.len(), 2);

    let first = &job_file.jobs[0];
    assert_eq!(first.input, "manual.pdf");
    assert!(first.manual.is_none());
    assert!(first.pages.is_none());

    let second = &job_file.jobs[1];
    assert_eq!(second.manual.as_deref(), Some("PROCSG02"));
    assert_eq!(second.pages, Some(vec![1, 3, 4]));
    assert_eq!(second.preview, Some(true));

    let settings = Settings::default();
    assert!(!MergedConfig::new(&settings, first).preview);
    assert!(MergedConfig::new(&settings, second).preview);
}

#[test]
fn test_job_file_invalid_pages() {
    let yaml = r#"
jobs:
  - input: a.pdf
    output: out/
    pages: "5-1"
"#;
    assert!(serde_yml::from_str::<JobFile>(yaml).is_err());
}

#[test]
fn test_merged_config_applies_overrides() {
    let yaml = r#"
jobs:
  - input: a.pdf
    output: out/
    prefix: XYZ
    bold_required: false
    font_size_range: [9.0, 20.0]
"#;
    let job_file: JobFile = serde_yml::from_str(yaml).unwrap();
    let settings = Settings::default();
    let merged = MergedConfig::new(&settings, &job_file.jobs[0]);

    assert_eq!(merged.settings.prefix, "XYZ");
    assert!(!merged.settings.bold_required);
    assert_eq!(merged.settings.font_size_range, [9.0, 20.0]);
    // 上書きしていない値は設定ファイルのまま
    assert_eq!(merged.settings.title_min_length, settings.title_min_length);
}

#[test]
fn test_merged_config_without_overrides() {
    let yaml = "jobs:\n  - input: a.pdf\n    output: out/\n";
    let job_file: JobFile = serde_yml::from_str(yaml).unwrap();
    let merged = MergedConfig::new(&Settings::default(), &job_file.jobs[0]);
    assert_eq!(merged.settings.prefix, "CRL");
    assert!(merged.settings.bold_required);
    assert!(merged.manual.is_none());
}

// ============================================================
// 5. settings.yaml の自動検出
// ============================================================

#[test]
fn test_load_settings_for_job_reads_sibling_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut f = std::fs::File::create(dir.path().join("settings.yaml")).unwrap();
    writeln!(f, "title_min_length: 3").unwrap();
    let job_path = dir.path().join("jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should load settings");
    assert_eq!(settings.title_min_length, 3);
}

#[test]
fn test_load_settings_for_job_defaults_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = dir.path().join("jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should fall back to defaults");
    assert_eq!(settings.title_min_length, 5);
}
