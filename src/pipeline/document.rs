// 文書単位処理: 並列ページ処理 → ページ順に統合 → 対応付け → 検証 → 命名
//
// ページの解析は並列だが、統合以降は単一の逐次処理で行う。
// 重複判定のハッシュ登録は検証器だけが保持し、並列に更新されることはない。

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analysis::adaptive::{DocumentPattern, PatternLearner};
use crate::analysis::associator::Associator;
use crate::analysis::section_detector::SectionIndex;
use crate::error::FigureError;
use crate::filter::validator::Validator;
use crate::model::{ImageRecord, PageData, PageLayout, PageSource, Section};
use crate::naming::nomenclature::{AssignedName, NamingScheme, assign_names};
use crate::pipeline::context::Context;
use crate::pipeline::page_processor::{PageAnalysis, PageWarning, analyze_page, unreadable_page};

/// マニュアル名の推定に使うフッタのページ数
const FOOTER_SCAN_PAGES: usize = 3;
/// 一度に読み込むページ数
const PAGE_CHUNK: usize = 16;

/// 1文書の処理結果。
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    /// (page, position_y) 順、キーの重複なし
    pub sections: Vec<Section>,
    /// ページ番号順
    pub layouts: Vec<PageLayout>,
    /// ページ/位置順。棄却されたレコードも含む。
    pub records: Vec<ImageRecord>,
    /// 採用画像の命名結果。`assign_names` を呼ぶまでは空。
    pub names: Vec<AssignedName>,
    pub warnings: Vec<PageWarning>,
    /// 処理したページ数
    pub page_count: u32,
    /// 先頭ページから順に、フッタ帯のテキスト
    pub footer_text: Vec<String>,
    /// 適応的な検出で採用した見出しの傾向
    pub learned_pattern: Option<DocumentPattern>,
}

impl DocumentAnalysis {
    /// 採用画像に正規のファイル名を割り当て、各レコードにも記録する。
    pub fn assign_names(&mut self, scheme: &NamingScheme) -> &[AssignedName] {
        self.names = assign_names(&self.records, &self.sections, scheme);
        for record in &mut self.records {
            record.filename = None;
        }
        for name in &self.names {
            if let Some(record) = self.records.iter_mut().find(|r| r.id == name.id) {
                record.filename = Some(name.filename.clone());
            }
        }
        &self.names
    }

    pub fn accepted(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter().filter(|r| r.is_accepted())
    }

    pub fn rejected_count(&self) -> usize {
        self.records.iter().filter(|r| r.rejection().is_some()).count()
    }
}

/// メモリ上のページ列を処理し、命名まで行う。
pub fn process_document(
    ctx: &Context,
    pages: &[PageData],
    scheme: &NamingScheme,
) -> crate::error::Result<DocumentAnalysis> {
    let mut analysis = analyze_document(ctx, pages, None)?;
    analysis.assign_names(scheme);
    Ok(analysis)
}

/// ページ供給元から文書を解析する（命名は行わない）。
///
/// `pages` は1始まりのページ番号で、Noneなら全ページ。
/// ページ数を取得できない場合と範囲外のページ指定は致命的なエラー。
/// 個々のページの読み込み失敗は警告として記録し、そのページを空として扱う。
pub fn analyze_document<S>(
    ctx: &Context,
    source: &S,
    pages: Option<&[u32]>,
) -> crate::error::Result<DocumentAnalysis>
where
    S: PageSource + ?Sized,
{
    let total = source.page_count()?;
    let indices: Vec<u32> = match pages {
        Some(pages) => {
            if let Some(&p) = pages.iter().find(|&&p| p == 0 || p > total) {
                return Err(FigureError::config(format!(
                    "page {p} out of range (document has {total} pages)"
                )));
            }
            let mut indices: Vec<u32> = pages.iter().map(|p| p - 1).collect();
            indices.sort_unstable();
            indices.dedup();
            indices
        }
        None => (0..total).collect(),
    };

    let adapted = if ctx.settings.adaptive_detection {
        learn_pattern(ctx, source, &indices).and_then(|pattern| ctx.adapted(pattern))
    } else {
        None
    };
    let ctx = adapted.as_ref().unwrap_or(ctx);

    // --- ページ単位処理 ---
    // 読み込みはチャンクごとに逐次、解析はチャンク内で並列
    let mut page_results: Vec<PageAnalysis> = Vec::with_capacity(indices.len());
    for chunk in indices.chunks(PAGE_CHUNK) {
        let loaded: Vec<(u32, crate::error::Result<PageData>)> = chunk
            .iter()
            .map(|&index| (index, source.load_page(index)))
            .collect();

        let analyzed = ctx.install(|| {
            loaded
                .into_par_iter()
                .map(|(index, page)| match page {
                    Ok(mut page) => {
                        page.index = index;
                        analyze_page(ctx, page)
                    }
                    Err(e) => unreadable_page(ctx, index, &e),
                })
                .collect::<Vec<_>>()
        });
        page_results.extend(analyzed);
    }

    // 完了順に依存しないよう、ページ順に並べてから統合する
    page_results.sort_by_key(|p| p.page);

    Ok(merge_pages(ctx, page_results))
}

/// 選択されたページのテキスト行から見出しの傾向を学習する。
///
/// 読み込めないページは飛ばす（本処理で警告として記録される）。
fn learn_pattern<S>(ctx: &Context, source: &S, indices: &[u32]) -> Option<DocumentPattern>
where
    S: PageSource + ?Sized,
{
    let mut learner = PatternLearner::new(&ctx.patterns);
    for &index in indices {
        if let Ok(page) = source.load_page(index) {
            learner.observe_page(&page.lines);
        }
    }
    let samples = learner.samples();
    let pattern = learner.finish(&ctx.settings);
    match &pattern {
        Some(p) if p.confidence > ctx.settings.adaptive_confidence_threshold => info!(
            samples,
            font_sizes = ?p.font_sizes,
            confidence = p.confidence,
            "heading pattern adopted"
        ),
        _ => debug!(samples, "no confident heading pattern; using configured detection"),
    }
    pattern
}

/// ページごとの結果を統合し、対応付けと検証を逐次に行う。
fn merge_pages(ctx: &Context, page_results: Vec<PageAnalysis>) -> DocumentAnalysis {
    let settings = &ctx.settings;
    let page_count = page_results.len() as u32;

    let mut sections = Vec::new();
    let mut layouts = Vec::with_capacity(page_results.len());
    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut footer_text = Vec::new();

    for (i, page) in page_results.into_iter().enumerate() {
        sections.extend(page.sections);
        layouts.push(page.layout);
        records.extend(page.records);
        warnings.extend(page.warnings);
        if i < FOOTER_SCAN_PAGES {
            footer_text.extend(page.footer_text);
        }
    }

    let index = SectionIndex::new(sections);
    records.sort_by(|a, b| a.position_cmp(b));

    Associator::new(settings, &index, &layouts).associate_all(&mut records);
    Validator::new(settings, &layouts, page_count, &records).validate_all(&mut records);

    let analysis = DocumentAnalysis {
        sections: index.into_sections(),
        layouts,
        records,
        names: Vec::new(),
        warnings,
        page_count,
        footer_text,
        learned_pattern: ctx.learned.clone(),
    };

    info!(
        pages = analysis.page_count,
        sections = analysis.sections.len(),
        images = analysis.records.len(),
        accepted = analysis.accepted().count(),
        warnings = analysis.warnings.len(),
        "document analyzed"
    );

    analysis
}
