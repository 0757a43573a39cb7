// 画像の検証と重複除去
//
// 規則は次の順に評価し、最初に該当したものを棄却理由とする:
//   1. サイズ  2. 縦横比  3. ヘッダ/フッタ帯  4. 重複  5. ロゴ（多数ページに出現）
// 画像の種類の推定は規則とは独立で、採否に関係なく記録する。

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::config::settings::Settings;
use crate::error::{ErrorKind, FigureError};
use crate::filter::classify::classify;
use crate::filter::registry::HashRegistry;
use crate::model::{
    BoilerplateBand, ImageRecord, PageLayout, RawImage, RejectionReason, ValidationStatus,
};

pub struct Validator<'a> {
    settings: &'a Settings,
    /// ページ番号順に整列済み
    layouts: &'a [PageLayout],
    page_count: u32,
    /// 内容ハッシュごとの出現ページ
    hash_pages: HashMap<String, BTreeSet<u32>>,
    registry: HashRegistry,
}

impl<'a> Validator<'a> {
    /// `records` 全体からハッシュごとの出現ページ集合を作ってから検証器を構築する。
    pub fn new(
        settings: &'a Settings,
        layouts: &'a [PageLayout],
        page_count: u32,
        records: &[ImageRecord],
    ) -> Self {
        let mut hash_pages: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for image in records.iter().filter_map(|r| r.image.as_ref()) {
            hash_pages
                .entry(image.content_hash.clone())
                .or_default()
                .insert(image.id.page);
        }

        Self {
            settings,
            layouts,
            page_count,
            hash_pages,
            registry: HashRegistry::new(),
        }
    }

    /// ページ/位置順に整列済みのレコードを順に検証する。
    ///
    /// 採用した画像のハッシュは登録され、以降の同一画像は重複として棄却される。
    /// 抽出・対応付けの段階で棄却済みのレコードはそのまま残す。
    pub fn validate_all(&mut self, records: &mut [ImageRecord]) {
        debug_assert!(
            records.windows(2).all(|w| w[0].position_cmp(&w[1]).is_le()),
            "records must be in page/position order"
        );

        let mut accepted = 0usize;
        for record in records.iter_mut() {
            if is_upstream_failure(&record.status) {
                continue;
            }
            let Some(image) = record.image.as_ref() else {
                continue;
            };
            if image.bbox.is_well_formed()
                && let Some(layout) = self.layout(image.id.page)
            {
                record.image_type = classify(&image.bbox, layout);
            }

            record.status = match self.evaluate(image) {
                Ok(None) => {
                    self.registry.register(image);
                    accepted += 1;
                    ValidationStatus::Accepted
                }
                Ok(Some(reason)) => {
                    debug!(
                        page = image.id.page,
                        sequence = image.id.sequence,
                        rule = reason.label(),
                        "image rejected"
                    );
                    ValidationStatus::Rejected(reason)
                }
                Err(e) => ValidationStatus::Rejected(RejectionReason::failed(&e)),
            };
        }

        info!(accepted, total = records.len(), "image validation finished");
    }

    /// 規則を順に評価し、最初に該当した棄却理由を返す。
    ///
    /// メタデータが不正で規則を評価できない場合は `ValidationError`。
    pub fn evaluate(&self, image: &RawImage) -> crate::error::Result<Option<RejectionReason>> {
        let bbox = &image.bbox;
        if !bbox.is_well_formed() {
            return Err(FigureError::validation(format!(
                "malformed bounding box on page {}: {:?}",
                image.id.page, bbox
            )));
        }

        if let Some(detail) = self.size_violation(image) {
            return Ok(Some(RejectionReason::Size { detail }));
        }

        let ratio = bbox.aspect_ratio().ok_or_else(|| {
            FigureError::validation(format!(
                "aspect ratio undefined for zero-height image on page {}",
                image.id.page
            ))
        })?;
        if ratio < self.settings.min_ratio || ratio > self.settings.max_ratio {
            return Ok(Some(RejectionReason::Aspect { ratio }));
        }

        let layout = self.layout(image.id.page).ok_or_else(|| {
            FigureError::validation(format!("no layout for page {}", image.id.page))
        })?;
        if layout.in_header(bbox) {
            return Ok(Some(RejectionReason::Boilerplate {
                band: BoilerplateBand::Header,
            }));
        }
        if layout.in_footer(bbox) {
            return Ok(Some(RejectionReason::Boilerplate {
                band: BoilerplateBand::Footer,
            }));
        }

        if let Some(of) = self.registry.find_exact(&image.content_hash) {
            return Ok(Some(RejectionReason::Duplicate { of }));
        }
        let threshold = self.settings.similarity_threshold;
        if threshold < 1.0
            && let Some(hash) = &image.perceptual_hash
            && let Some((of, similarity)) = self.registry.find_similar(hash, threshold)
        {
            return Ok(Some(RejectionReason::NearDuplicate { of, similarity }));
        }

        if let Some(pages) = self.logo_pages(&image.content_hash) {
            return Ok(Some(RejectionReason::Logo {
                pages,
                total_pages: self.page_count,
            }));
        }

        Ok(None)
    }

    fn size_violation(&self, image: &RawImage) -> Option<String> {
        let s = self.settings;
        let (w, h) = (image.bbox.width(), image.bbox.height());
        let bytes = image.data.len();

        if w < s.min_width {
            Some(format!("width {w} < min_width {}", s.min_width))
        } else if h < s.min_height {
            Some(format!("height {h} < min_height {}", s.min_height))
        } else if w > s.max_width {
            Some(format!("width {w} > max_width {}", s.max_width))
        } else if h > s.max_height {
            Some(format!("height {h} > max_height {}", s.max_height))
        } else if w * h < s.min_area {
            Some(format!("area {} < min_area {}", w * h, s.min_area))
        } else if bytes > s.max_bytes {
            Some(format!("{bytes} bytes > max_bytes {}", s.max_bytes))
        } else if bytes < s.min_bytes {
            Some(format!("{bytes} bytes < min_bytes {}", s.min_bytes))
        } else {
            None
        }
    }

    /// ハッシュが閾値を超える割合のページに現れる場合、その出現ページ数。
    fn logo_pages(&self, content_hash: &str) -> Option<u32> {
        if self.page_count == 0 || self.page_count < self.settings.logo_min_pages {
            return None;
        }
        let pages = self.hash_pages.get(content_hash).map_or(0, |p| p.len()) as u32;
        let fraction = f64::from(pages) / f64::from(self.page_count);
        (fraction > self.settings.logo_page_fraction).then_some(pages)
    }

    fn layout(&self, page: u32) -> Option<&PageLayout> {
        self.layouts
            .binary_search_by_key(&page, |l| l.page)
            .ok()
            .map(|i| &self.layouts[i])
    }
}

/// 検証より前の段階（抽出・対応付け）で棄却されたか。
fn is_upstream_failure(status: &ValidationStatus) -> bool {
    matches!(
        status,
        ValidationStatus::Rejected(RejectionReason::Failed { kind, .. })
            if *kind != ErrorKind::Validation
    )
}
