use std::path::Path;

use serde::Deserialize;

use crate::error::FigureError;

/// バウンディングボックスが欠落した画像の扱い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBboxPolicy {
    /// 抽出エラーとして棄却する。
    Reject,
    /// ページ内の順番から合成した矩形を割り当てる。
    Synthesize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // セクション検出
    pub font_size_range: [f64; 2],
    pub bold_required: bool,
    pub title_min_length: usize,
    pub section_patterns: Vec<String>,

    // 適応的なセクション検出（既定で無効）
    pub adaptive_detection: bool,
    pub adaptive_min_samples: usize,
    pub adaptive_confidence_threshold: f64,
    pub adaptive_font_tolerance: f64,
    pub adaptive_match_threshold: f64,

    // レイアウト解析
    pub min_gap_width: f64,
    pub min_lines_per_column: usize,
    pub spanning_width_ratio: f64,
    pub header_ratio: f64,
    pub footer_ratio: f64,

    // 画像とセクションの対応付け
    pub max_distance_pixels: f64,
    pub cross_column_penalty: f64,
    pub page_distance_pixels: f64,
    pub low_confidence_factor: f64,

    // 画像の検証
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub min_area: f64,
    pub min_bytes: usize,
    pub max_bytes: usize,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub similarity_threshold: f64,
    pub logo_page_fraction: f64,
    pub logo_min_pages: u32,
    pub missing_bbox: MissingBboxPolicy,

    // 命名
    pub prefix: String,
    pub unassigned_label: String,

    pub parallel_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            font_size_range: [12.0, 16.0],
            bold_required: true,
            title_min_length: 5,
            section_patterns: vec![
                r"^\d+(?:\.\d+)*$".to_string(),
                r"^[A-Z]+\d+(?:\.\d+)*$".to_string(),
            ],
            adaptive_detection: false,
            adaptive_min_samples: 3,
            adaptive_confidence_threshold: 0.7,
            adaptive_font_tolerance: 2.0,
            adaptive_match_threshold: 0.7,
            min_gap_width: 20.0,
            min_lines_per_column: 3,
            spanning_width_ratio: 0.6,
            header_ratio: 0.1,
            footer_ratio: 0.1,
            max_distance_pixels: 200.0,
            cross_column_penalty: 100.0,
            page_distance_pixels: 1000.0,
            low_confidence_factor: 0.5,
            min_width: 50.0,
            min_height: 50.0,
            max_width: 2000.0,
            max_height: 2000.0,
            min_area: 2500.0,
            min_bytes: 0,
            max_bytes: 20_000_000,
            min_ratio: 0.1,
            max_ratio: 10.0,
            similarity_threshold: 1.0,
            logo_page_fraction: 0.5,
            logo_min_pages: 3,
            missing_bbox: MissingBboxPolicy::Reject,
            prefix: "CRL".to_string(),
            unassigned_label: "0".to_string(),
            parallel_workers: 0,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml)
            .map_err(|e| FigureError::config(format!("Failed to parse settings YAML: {e}")))
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 各設定値が有効な範囲にあることを検証する。
    ///
    /// 範囲外の値は `ConfigError` として返す（処理は続行できない）。
    pub fn validate(&self) -> crate::error::Result<()> {
        let [min_size, max_size] = self.font_size_range;
        if !(min_size.is_finite() && max_size.is_finite()) || min_size < 0.0 {
            return Err(FigureError::config(format!(
                "font_size_range must be finite and non-negative: {:?}",
                self.font_size_range
            )));
        }
        if min_size > max_size {
            return Err(FigureError::config(format!(
                "font_size_range is inverted: min ({min_size}) > max ({max_size})"
            )));
        }
        if self.section_patterns.is_empty() {
            return Err(FigureError::config(
                "section_patterns must contain at least one pattern",
            ));
        }

        ensure_non_negative("adaptive_font_tolerance", self.adaptive_font_tolerance)?;
        for (name, threshold) in [
            ("adaptive_confidence_threshold", self.adaptive_confidence_threshold),
            ("adaptive_match_threshold", self.adaptive_match_threshold),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(FigureError::config(format!(
                    "{name} must be in [0, 1]: {threshold}"
                )));
            }
        }

        ensure_positive("min_gap_width", self.min_gap_width)?;
        ensure_positive("max_distance_pixels", self.max_distance_pixels)?;
        ensure_non_negative("cross_column_penalty", self.cross_column_penalty)?;
        ensure_non_negative("page_distance_pixels", self.page_distance_pixels)?;
        if !(self.spanning_width_ratio > 0.0 && self.spanning_width_ratio <= 1.0) {
            return Err(FigureError::config(format!(
                "spanning_width_ratio must be in (0, 1]: {}",
                self.spanning_width_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.low_confidence_factor) {
            return Err(FigureError::config(format!(
                "low_confidence_factor must be in [0, 1]: {}",
                self.low_confidence_factor
            )));
        }

        for (name, ratio) in [
            ("header_ratio", self.header_ratio),
            ("footer_ratio", self.footer_ratio),
        ] {
            if !(0.0..1.0).contains(&ratio) {
                return Err(FigureError::config(format!(
                    "{name} must be in [0, 1): {ratio}"
                )));
            }
        }
        if self.header_ratio + self.footer_ratio >= 1.0 {
            return Err(FigureError::config(format!(
                "header_ratio + footer_ratio must be < 1 (got {} + {})",
                self.header_ratio, self.footer_ratio
            )));
        }

        ensure_non_negative("min_width", self.min_width)?;
        ensure_non_negative("min_height", self.min_height)?;
        ensure_non_negative("min_area", self.min_area)?;
        ensure_positive("max_width", self.max_width)?;
        ensure_positive("max_height", self.max_height)?;
        if self.min_width > self.max_width || self.min_height > self.max_height {
            return Err(FigureError::config(format!(
                "image size range is inverted: min {}x{} > max {}x{}",
                self.min_width, self.min_height, self.max_width, self.max_height
            )));
        }
        if self.min_bytes > self.max_bytes {
            return Err(FigureError::config(format!(
                "byte size range is inverted: min ({}) > max ({})",
                self.min_bytes, self.max_bytes
            )));
        }
        ensure_positive("min_ratio", self.min_ratio)?;
        ensure_positive("max_ratio", self.max_ratio)?;
        if self.min_ratio > self.max_ratio {
            return Err(FigureError::config(format!(
                "aspect ratio range is inverted: min ({}) > max ({})",
                self.min_ratio, self.max_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(FigureError::config(format!(
                "similarity_threshold must be in [0, 1]: {}",
                self.similarity_threshold
            )));
        }
        if !(self.logo_page_fraction > 0.0 && self.logo_page_fraction <= 1.0) {
            return Err(FigureError::config(format!(
                "logo_page_fraction must be in (0, 1]: {}",
                self.logo_page_fraction
            )));
        }

        if self.prefix.trim().is_empty() {
            return Err(FigureError::config("prefix cannot be empty"));
        }
        if self.unassigned_label.trim().is_empty() {
            return Err(FigureError::config("unassigned_label cannot be empty"));
        }

        Ok(())
    }
}

fn ensure_positive(name: &str, value: f64) -> crate::error::Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FigureError::config(format!("{name} must be positive: {value}")))
    }
}

fn ensure_non_negative(name: &str, value: f64) -> crate::error::Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FigureError::config(format!(
            "{name} must be non-negative: {value}"
        )))
    }
}
