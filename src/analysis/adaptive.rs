// 適応的なセクション検出: 文書全体の見出し候補からフォントサイズと太字の傾向を学習し、
// 検出条件を文書に合わせて調整する。
//
// 既定では無効。有効にすると本処理の前に全ページのテキスト行を一度走査する。

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::analysis::pattern::PatternSet;
use crate::analysis::section_detector::{MIN_ALPHA_RUN, has_alpha_run, round_font_size};
use crate::config::settings::Settings;
use crate::model::{Section, TextLine};

/// 学習するフォントサイズの種類数
const MAX_LEARNED_SIZES: usize = 3;
/// サイズの学習に使う候補のスコア下限
const STRONG_CANDIDATE: f64 = 0.6;
/// 調整後のフォントサイズ範囲の下限と上限
const MIN_ADAPTED_SIZE: f64 = 8.0;
const MAX_ADAPTED_SIZE: f64 = 20.0;
/// 既存のセクションとこの距離内にある候補は同じ見出しとみなす
const SAME_HEADING_DISTANCE: f64 = 10.0;
/// 左寄せとみなすx座標
const LEFT_ALIGNED_X: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    font_size: f64,
    is_bold: bool,
    score: f64,
}

/// 文書から学習した見出しの傾向。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPattern {
    /// 見出しに多いフォントサイズ（小数第1位に丸め済み、出現数の多い順）
    pub font_sizes: Vec<f64>,
    /// 候補のうち太字の割合
    pub bold_ratio: f64,
    pub confidence: f64,
    pub samples: usize,
}

/// 見出し候補の集計。ページごとに [`observe_page`](Self::observe_page) を呼び、
/// 最後に [`finish`](Self::finish) で傾向を求める。
pub struct PatternLearner<'a> {
    patterns: &'a PatternSet,
    candidates: Vec<Candidate>,
}

impl<'a> PatternLearner<'a> {
    pub fn new(patterns: &'a PatternSet) -> Self {
        Self {
            patterns,
            candidates: Vec::new(),
        }
    }

    /// 番号パターンに一致する行と、英字を含む次の行の組を候補として集める。
    ///
    /// フォントサイズや太字の条件は見ない。座標が不正な行は無視する。
    pub fn observe_page(&mut self, lines: &[TextLine]) {
        for pair in lines.windows(2) {
            let (number, title) = (&pair[0], &pair[1]);
            if !number.bbox.is_well_formed() || !number.font_size.is_finite() {
                continue;
            }
            if self.patterns.first_match(number.text.trim()).is_none()
                || !has_alpha_run(title.text.trim(), MIN_ALPHA_RUN)
            {
                continue;
            }
            self.candidates.push(Candidate {
                font_size: round_font_size(number.font_size),
                is_bold: number.is_bold,
                score: candidate_score(number),
            });
        }
    }

    pub fn samples(&self) -> usize {
        self.candidates.len()
    }

    /// 集めた候補から傾向を求める。候補が `adaptive_min_samples` 未満ならNone。
    pub fn finish(self, settings: &Settings) -> Option<DocumentPattern> {
        let n = self.candidates.len();
        if n == 0 || n < settings.adaptive_min_samples {
            return None;
        }

        // サイズは0.1刻みに丸めてあるので10倍した整数で数える
        let mut size_counts: BTreeMap<i64, usize> = BTreeMap::new();
        for c in self.candidates.iter().filter(|c| c.score > STRONG_CANDIDATE) {
            *size_counts.entry(size_key(c.font_size)).or_default() += 1;
        }
        let mut ranked: Vec<(i64, usize)> = size_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let font_sizes: Vec<f64> = ranked
            .iter()
            .take(MAX_LEARNED_SIZES)
            .map(|(key, _)| *key as f64 / 10.0)
            .collect();

        let distinct_sizes = self
            .candidates
            .iter()
            .map(|c| size_key(c.font_size))
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        let bold_ratio = self.candidates.iter().filter(|c| c.is_bold).count() as f64 / n as f64;
        let mean_score = self.candidates.iter().map(|c| c.score).sum::<f64>() / n as f64;

        let mut confidence = 0.0;
        if !font_sizes.is_empty() {
            confidence += font_sizes.len() as f64 / distinct_sizes as f64 * 0.4;
        }
        confidence += bold_ratio * 0.3;
        confidence += mean_score * 0.3;

        let pattern = DocumentPattern {
            font_sizes,
            bold_ratio,
            confidence: confidence.min(1.0),
            samples: n,
        };
        debug!(?pattern, "heading pattern learned");
        Some(pattern)
    }
}

impl DocumentPattern {
    /// 傾向として太字を採るか（候補の過半数が太字）。
    pub fn prefers_bold(&self) -> bool {
        self.bold_ratio >= 0.5
    }

    /// 十分な確信度があれば検出条件を調整した設定を返す。
    ///
    /// フォントサイズ範囲は学習したサイズの前後に許容幅を取った範囲になる。
    pub fn adapt(&self, settings: &Settings) -> Option<Settings> {
        if self.confidence <= settings.adaptive_confidence_threshold {
            return None;
        }
        let min = self.font_sizes.iter().copied().reduce(f64::min)?;
        let max = self.font_sizes.iter().copied().reduce(f64::max)?;
        let tolerance = settings.adaptive_font_tolerance;

        let mut adapted = settings.clone();
        let low = (min - tolerance).max(MIN_ADAPTED_SIZE);
        let high = (max + tolerance).min(MAX_ADAPTED_SIZE);
        adapted.font_size_range = [low.min(high), high];
        adapted.bold_required = settings.bold_required || self.prefers_bold();
        Some(adapted)
    }

    /// 番号行が学習した傾向にどれだけ合うか。
    fn match_score(&self, settings: &Settings, number_line: &TextLine) -> f64 {
        let size = round_font_size(number_line.font_size);
        let mut score = 0.0;
        if self
            .font_sizes
            .iter()
            .any(|s| (size - s).abs() <= settings.adaptive_font_tolerance)
        {
            score += 0.4;
        }
        if self.prefers_bold() && number_line.is_bold {
            score += 0.3;
        }
        if number_line.text.contains('.') {
            score += 0.2;
        }
        score
    }

    /// 通常の検出で見つからなかった見出しを、学習した傾向から補う。
    ///
    /// 番号とタイトルの条件は通常の検出と同じで、フォントサイズと太字の
    /// 条件だけを傾向との一致度に置き換える。`existing` の近くにある候補は除く。
    pub fn detect_additional(
        &self,
        settings: &Settings,
        patterns: &PatternSet,
        page: u32,
        lines: &[TextLine],
        existing: &[Section],
    ) -> Vec<Section> {
        let mut found: Vec<Section> = Vec::new();
        let mut i = 0;
        while i + 1 < lines.len() {
            let (number_line, title_line) = (&lines[i], &lines[i + 1]);
            let number = number_line.text.trim();
            let title = title_line.text.trim();

            let near_known = |y: f64| {
                existing
                    .iter()
                    .chain(found.iter())
                    .any(|s| s.page == page && (s.position_y - y).abs() < SAME_HEADING_DISTANCE)
            };

            let candidate = patterns.first_match(number).filter(|_| {
                title.chars().count() >= settings.title_min_length
                    && has_alpha_run(title, MIN_ALPHA_RUN)
                    && !near_known(number_line.bbox.y_min)
            });
            let score = self.match_score(settings, number_line);

            match candidate {
                Some(pattern_index) if score >= settings.adaptive_match_threshold => {
                    debug!(page, number, title, score, "section detected from learned pattern");
                    found.push(Section {
                        number: number.to_string(),
                        title: title.to_string(),
                        page,
                        position_y: number_line.bbox.y_min,
                        position_x: number_line.bbox.x_min,
                        right_x: number_line.bbox.x_max.max(title_line.bbox.x_max),
                        confidence: score.min(1.0),
                        pattern_index,
                    });
                    i += 2;
                }
                _ => i += 1,
            }
        }
        found
    }
}

/// 見出しらしさの初期スコア（サイズ・太字・左寄せ・階層番号）。
fn candidate_score(number_line: &TextLine) -> f64 {
    let size = round_font_size(number_line.font_size);
    let mut score: f64 = 0.0;
    if size >= 12.0 {
        score += 0.3;
    }
    if size >= 14.0 {
        score += 0.2;
    }
    if number_line.is_bold {
        score += 0.3;
    }
    if number_line.bbox.x_min < LEFT_ALIGNED_X {
        score += 0.2;
    }
    if number_line.text.contains('.') {
        score += 0.3;
    }
    score.min(1.0)
}

fn size_key(size: f64) -> i64 {
    (size * 10.0).round() as i64
}
