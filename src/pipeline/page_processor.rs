// ページ単位処理: レイアウト解析 → セクション検出 → 画像収集
//
// 見出しの傾向を学習済みなら、通常の検出で漏れた見出しをそこから補う。
//
// 各ページは互いに独立しており、並列に処理できる。

use serde::Serialize;
use tracing::warn;

use crate::analysis::layout::LayoutAnalyzer;
use crate::analysis::section_detector::SectionDetector;
use crate::error::{ErrorKind, FigureError};
use crate::images::collector::ImageCollector;
use crate::model::{BBox, ImageRecord, PageData, PageLayout, Section};
use crate::pipeline::context::Context;

/// ページ単位の失敗。そのページは縮退して処理を続ける。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageWarning {
    pub page: u32,
    pub kind: ErrorKind,
    pub message: String,
}

impl PageWarning {
    pub fn new(page: u32, error: &FigureError) -> Self {
        Self {
            page,
            kind: error.kind(),
            message: error.detail(),
        }
    }
}

/// 1ページ分の処理結果。
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub page: u32,
    pub sections: Vec<Section>,
    pub layout: PageLayout,
    pub records: Vec<ImageRecord>,
    /// フッタ帯に収まるテキスト行（マニュアル名の推定に使う）
    pub footer_text: Vec<String>,
    pub warnings: Vec<PageWarning>,
}

/// 1ページを解析する。
///
/// セクション検出に失敗したページはセクション0件として警告を記録する。
/// 画像ごとの失敗は棄却レコードになり、他の画像には影響しない。
pub fn analyze_page(ctx: &Context, page: PageData) -> PageAnalysis {
    let settings = &ctx.settings;
    let index = page.index;

    let image_boxes: Vec<BBox> = page.images.iter().filter_map(|i| i.bbox).collect();
    let layout = LayoutAnalyzer::new(settings).analyze(
        index,
        page.width,
        page.height,
        &page.lines,
        &image_boxes,
    );

    let mut warnings = Vec::new();
    let sections = match SectionDetector::new(settings, &ctx.patterns).detect_page(index, &page.lines)
    {
        Ok(mut sections) => {
            if let Some(learned) = &ctx.learned {
                let additional =
                    learned.detect_additional(settings, &ctx.patterns, index, &page.lines, &sections);
                if !additional.is_empty() {
                    sections.extend(additional);
                    sections.sort_by(|a, b| a.position_y.total_cmp(&b.position_y));
                }
            }
            sections
        }
        Err(e) => {
            warn!(page = index, error = %e, "section detection failed; page yields no sections");
            warnings.push(PageWarning::new(index, &e));
            Vec::new()
        }
    };

    let footer_text = page
        .lines
        .iter()
        .filter(|l| l.bbox.is_well_formed() && layout.in_footer(&l.bbox))
        .map(|l| l.text.clone())
        .collect();

    let records = ImageCollector::new(settings).collect_page(index, page.images);

    PageAnalysis {
        page: index,
        sections,
        layout,
        records,
        footer_text,
        warnings,
    }
}

/// 読み込めなかったページ。セクションも画像も持たない。
pub fn unreadable_page(ctx: &Context, index: u32, error: &FigureError) -> PageAnalysis {
    warn!(page = index, error = %error, "page could not be read; skipping its content");
    let mut analysis = analyze_page(ctx, PageData::empty(index));
    analysis.warnings.push(PageWarning::new(index, error));
    analysis
}
