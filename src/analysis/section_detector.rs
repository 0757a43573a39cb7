// セクション検出: 番号行 + タイトル行のペアを判定し、(page, y) 順のセクション列を作る

use tracing::debug;

use crate::analysis::pattern::PatternSet;
use crate::config::settings::Settings;
use crate::error::FigureError;
use crate::model::{Section, SectionRef, TextLine};

/// タイトルに必要な連続英字数
pub const MIN_ALPHA_RUN: usize = 3;

pub struct SectionDetector<'a> {
    settings: &'a Settings,
    patterns: &'a PatternSet,
}

impl<'a> SectionDetector<'a> {
    pub fn new(settings: &'a Settings, patterns: &'a PatternSet) -> Self {
        Self { settings, patterns }
    }

    /// 1ページ分の行列からセクションを検出する。
    ///
    /// 2行のウィンドウをスライドさせ、1行目が番号パターンに一致し2行目が
    /// タイトル条件を満たせばセクションとする。一致した場合は2行分進め、
    /// タイトル行が次の番号候補として再評価されないようにする。
    ///
    /// 座標やフォントサイズが不正な行を含むページは `SectionDetectionError`。
    pub fn detect_page(&self, page: u32, lines: &[TextLine]) -> crate::error::Result<Vec<Section>> {
        if let Some(i) = lines
            .iter()
            .position(|l| !l.bbox.is_well_formed() || !l.font_size.is_finite())
        {
            return Err(FigureError::section_detection(format!(
                "page {page}: line {i} has malformed geometry"
            )));
        }

        let mut sections = Vec::new();
        let mut i = 0;
        while i + 1 < lines.len() {
            let number_line = &lines[i];
            let title_line = &lines[i + 1];

            match self.match_pair(number_line, title_line) {
                Some(pattern_index) => {
                    let section = Section {
                        number: number_line.text.trim().to_string(),
                        title: title_line.text.trim().to_string(),
                        page,
                        position_y: number_line.bbox.y_min,
                        position_x: number_line.bbox.x_min,
                        right_x: number_line.bbox.x_max.max(title_line.bbox.x_max),
                        confidence: self.confidence(number_line, title_line, pattern_index),
                        pattern_index,
                    };
                    debug!(
                        page,
                        number = %section.number,
                        title = %section.title,
                        y = section.position_y,
                        "section detected"
                    );
                    sections.push(section);
                    i += 2;
                }
                None => i += 1,
            }
        }

        Ok(sections)
    }

    /// 2行がセクション見出しを構成する場合、一致したパターンのインデックスを返す。
    pub fn match_pair(&self, number_line: &TextLine, title_line: &TextLine) -> Option<usize> {
        let number = number_line.text.trim();
        let title = title_line.text.trim();

        let pattern_index = self.patterns.first_match(number)?;

        if title.chars().count() < self.settings.title_min_length {
            return None;
        }

        if self.settings.bold_required && !(number_line.is_bold && title_line.is_bold) {
            return None;
        }

        let [min_size, max_size] = self.settings.font_size_range;
        let in_range = |size: f64| {
            let rounded = round_font_size(size);
            min_size <= rounded && rounded <= max_size
        };
        if !(in_range(number_line.font_size) && in_range(title_line.font_size)) {
            return None;
        }

        if !has_alpha_run(title, MIN_ALPHA_RUN) {
            return None;
        }

        Some(pattern_index)
    }

    fn confidence(&self, number_line: &TextLine, title_line: &TextLine, pattern_index: usize) -> f64 {
        let mut confidence: f64 = 0.6;
        if number_line.is_bold && title_line.is_bold {
            confidence += 0.2;
        }
        if round_font_size(number_line.font_size) == round_font_size(title_line.font_size) {
            confidence += 0.1;
        }
        if pattern_index == 0 {
            confidence += 0.1;
        }
        confidence.min(1.0)
    }
}

/// フォントサイズを小数第1位に丸める。
pub fn round_font_size(size: f64) -> f64 {
    (size * 10.0).round() / 10.0
}

/// `text` が `n` 文字以上連続する英字を含むか。
pub fn has_alpha_run(text: &str, n: usize) -> bool {
    let mut run = 0;
    for c in text.chars() {
        if c.is_alphabetic() {
            run += 1;
            if run >= n {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// (page, position_y) 順に整列したセクション列と位置検索。
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    sections: Vec<Section>,
}

impl SectionIndex {
    /// ページごとの検出結果を結合し、(page, position_y) で整列する。
    ///
    /// 同一キーのセクションは最初に検出されたものだけを残す。
    pub fn new(sections: Vec<Section>) -> Self {
        let mut sections = sections;
        sections.sort_by(|a, b| {
            a.page
                .cmp(&b.page)
                .then_with(|| a.position_y.total_cmp(&b.position_y))
        });
        sections.dedup_by(|later, earlier| {
            let duplicate = later.page == earlier.page && later.position_y == earlier.position_y;
            if duplicate {
                debug!(
                    page = later.page,
                    number = %later.number,
                    "dropping section with duplicate position"
                );
            }
            duplicate
        });
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<Section> {
        self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, section: SectionRef) -> Option<&Section> {
        section.index().and_then(|i| self.sections.get(i))
    }

    /// 指定位置の直前にあるセクションを返す。
    ///
    /// 同一ページで `position_y < y` を満たす最後のセクション。なければ
    /// それより前のページの最後のセクション。どちらもなければ `Unassigned`。
    pub fn find_section_for_position(&self, page: u32, y: f64) -> SectionRef {
        let range = self.page_range(page);
        let start = range.start;

        if let Some(offset) = self.sections[range].iter().rposition(|s| s.position_y < y) {
            return SectionRef::Detected(start + offset);
        }

        self.last_before_page(page)
    }

    /// `page` より前のページにある最後のセクション。
    pub fn last_before_page(&self, page: u32) -> SectionRef {
        match self.sections.partition_point(|s| s.page < page) {
            0 => SectionRef::Unassigned,
            n => SectionRef::Detected(n - 1),
        }
    }

    /// `page` 上のセクションの添字範囲。
    pub fn page_range(&self, page: u32) -> std::ops::Range<usize> {
        let start = self.sections.partition_point(|s| s.page < page);
        let end = self.sections.partition_point(|s| s.page <= page);
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_alpha_run() {
        assert!(has_alpha_run("Setup", 3));
        assert!(has_alpha_run("12 abc", 3));
        assert!(has_alpha_run("Ébauche", 3));
        assert!(!has_alpha_run("a1b2c3", 3));
        assert!(!has_alpha_run("ab", 3));
    }

    #[test]
    fn test_round_font_size() {
        assert_eq!(round_font_size(13.96), 14.0);
        assert_eq!(round_font_size(16.04), 16.0);
        assert_eq!(round_font_size(11.94), 11.9);
    }
}
