// ジョブ単位: PDF読込 → 文書解析 → マニュアル名決定 → 命名 → 画像とレポートの書き出し
//
// プレビューでは画像を書き出さず、命名計画を含むレポートだけを残す。

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::settings::Settings;
use crate::naming::manual_name::deduce_manual_name;
use crate::naming::nomenclature::NamingScheme;
use crate::pdf::reader::PdfReader;
use crate::pipeline::context::Context;
use crate::pipeline::document::{DocumentAnalysis, analyze_document};
use crate::report::Report;

pub const REPORT_FILE_NAME: &str = "report.json";

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: PathBuf,
    /// Directory receiving the accepted images and the report.
    pub output_dir: PathBuf,
    pub settings: Settings,
    /// Explicit manual name; deduced from the document when absent.
    pub manual: Option<String>,
    /// 1-based page selection. `None` processes every page.
    pub pages: Option<Vec<u32>>,
    /// Plan the extraction without writing any image.
    pub preview: bool,
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub manual: String,
    pub pages_processed: u32,
    pub sections: usize,
    /// Accepted images that received a filename.
    pub images_named: usize,
    pub images_written: usize,
    pub images_rejected: usize,
    pub preview: bool,
    pub report_path: PathBuf,
}

/// Run a single extraction job.
///
/// Configuration errors and an unreadable document are fatal for the job;
/// page and image failures are recorded in the report.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let ctx = Context::new(config.settings.clone())?;
    let reader = PdfReader::open(&config.input_path)?;

    let mut analysis = analyze_document(&ctx, &reader, config.pages.as_deref())?;

    let manual = match &config.manual {
        Some(manual) => manual.clone(),
        None => {
            let stem = config
                .input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            deduce_manual_name(
                &analysis.footer_text,
                reader.document_title().as_deref(),
                &stem,
            )
        }
    };

    let scheme = NamingScheme::from_settings(&ctx.settings, manual.clone());
    analysis.assign_names(&scheme);

    std::fs::create_dir_all(&config.output_dir)?;
    let images_written = if config.preview {
        0
    } else {
        write_images(&analysis, &config.output_dir)?
    };

    let report_path = config.output_dir.join(REPORT_FILE_NAME);
    Report::new(&config.input_path, &manual, &analysis)
        .with_preview(config.preview)
        .write(&report_path)?;

    info!(
        input = %config.input_path.display(),
        manual = %manual,
        named = analysis.names.len(),
        written = images_written,
        preview = config.preview,
        "job finished"
    );

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_dir: config.output_dir.clone(),
        manual,
        pages_processed: analysis.page_count,
        sections: analysis.sections.len(),
        images_named: analysis.names.len(),
        images_written,
        images_rejected: analysis.rejected_count(),
        preview: config.preview,
        report_path,
    })
}

/// 採用画像を正規のファイル名で書き出し、書き出した件数を返す。
fn write_images(analysis: &DocumentAnalysis, output_dir: &Path) -> crate::error::Result<usize> {
    let mut written = 0;
    for record in analysis.accepted() {
        if let (Some(filename), Some(image)) = (&record.filename, &record.image) {
            std::fs::write(output_dir.join(filename), &image.data)?;
            written += 1;
        }
    }
    Ok(written)
}
