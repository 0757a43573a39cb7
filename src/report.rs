// 処理結果のJSONレポート

use std::path::Path;

use serde::Serialize;

use crate::analysis::adaptive::DocumentPattern;
use crate::filter::classify::ImageType;
use crate::model::{Association, BBox, ImageRecord, RejectionReason, Section, ValidationStatus};
use crate::pipeline::document::DocumentAnalysis;
use crate::pipeline::page_processor::PageWarning;

/// `report.json` の内容。
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub input: String,
    pub manual: &'a str,
    pub page_count: u32,
    /// trueなら画像は書き出されておらず、`filename` は予定名
    pub preview: bool,
    /// 適応的な検出で採用した見出しの傾向
    pub learned_pattern: Option<&'a DocumentPattern>,
    pub sections: &'a [Section],
    pub images: Vec<ImageEntry<'a>>,
    pub warnings: &'a [PageWarning],
}

#[derive(Debug, Serialize)]
pub struct ImageEntry<'a> {
    pub page: u32,
    pub sequence: u32,
    pub bbox: Option<BBox>,
    pub format: Option<&'a str>,
    pub content_hash: Option<&'a str>,
    /// 対応付けたセクション番号。未割当ならNone。
    pub section: Option<&'a str>,
    pub association: Association,
    pub image_type: ImageType,
    pub status: &'static str,
    pub reason: Option<&'a RejectionReason>,
    pub filename: Option<&'a str>,
}

impl<'a> ImageEntry<'a> {
    fn new(record: &'a ImageRecord, sections: &'a [Section]) -> Self {
        let status = match record.status {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Accepted => "accepted",
            ValidationStatus::Rejected(_) => "rejected",
        };
        Self {
            page: record.id.page,
            sequence: record.id.sequence,
            bbox: record.bbox,
            format: record.image.as_ref().map(|i| i.format.as_str()),
            content_hash: record.content_hash(),
            section: record
                .section
                .index()
                .and_then(|i| sections.get(i))
                .map(|s| s.number.as_str()),
            association: record.association,
            image_type: record.image_type,
            status,
            reason: record.rejection(),
            filename: record.filename.as_deref(),
        }
    }
}

impl<'a> Report<'a> {
    pub fn new(input: &Path, manual: &'a str, analysis: &'a DocumentAnalysis) -> Self {
        Self {
            input: input.display().to_string(),
            manual,
            page_count: analysis.page_count,
            preview: false,
            learned_pattern: analysis.learned_pattern.as_ref(),
            sections: &analysis.sections,
            images: analysis
                .records
                .iter()
                .map(|r| ImageEntry::new(r, &analysis.sections))
                .collect(),
            warnings: &analysis.warnings,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> crate::error::Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
