// 画像とセクションの対応付け（列を考慮した読み順）
//
// 読み順は列ごとに上から下、列は左から右（段組の新聞順）。
// 段をまたぐ全幅の見出しはページを帯に区切り、読み順は (帯, 列, y) になる。
// 全幅の図は、列に関係なくそれより上にあるセクションだけを直前の候補とする。

use tracing::{debug, warn};

use crate::analysis::section_detector::SectionIndex;
use crate::config::settings::Settings;
use crate::error::FigureError;
use crate::model::{
    Association, BBox, ImageRecord, PageLayout, RejectionReason, Section, SectionRef,
    ValidationStatus,
};

/// 段組ページ上の読み順キー (帯, 列, y)
type ReadingKey = (usize, usize, f64);

fn cmp_key(a: &ReadingKey, b: &ReadingKey) -> std::cmp::Ordering {
    a.0.cmp(&b.0)
        .then(a.1.cmp(&b.1))
        .then_with(|| a.2.total_cmp(&b.2))
}

pub struct Associator<'a> {
    settings: &'a Settings,
    index: &'a SectionIndex,
    /// ページ番号順に整列済み
    layouts: &'a [PageLayout],
}

impl<'a> Associator<'a> {
    pub fn new(settings: &'a Settings, index: &'a SectionIndex, layouts: &'a [PageLayout]) -> Self {
        Self {
            settings,
            index,
            layouts,
        }
    }

    fn layout(&self, page: u32) -> Option<&'a PageLayout> {
        self.layouts
            .binary_search_by_key(&page, |l| l.page)
            .ok()
            .map(|i| &self.layouts[i])
    }

    /// 全レコードを対応付ける。棄却済みのレコードは対象外。
    ///
    /// 対応付けに失敗したレコードは分類済みの理由とともに棄却される。
    pub fn associate_all(&self, records: &mut [ImageRecord]) {
        for record in records.iter_mut() {
            if record.status != ValidationStatus::Pending {
                continue;
            }
            let Some(bbox) = record.bbox else {
                continue;
            };
            match self.locate(record.id.page, &bbox) {
                Ok((section, association)) => {
                    record.section = section;
                    record.association = association;
                }
                Err(e) => {
                    warn!(page = record.id.page, sequence = record.id.sequence, error = %e, "association failed");
                    record.status = ValidationStatus::Rejected(RejectionReason::failed(&e));
                }
            }
        }
    }

    /// 画像の直前にあるセクションと対応付けの信頼度を求める。
    ///
    /// 距離が `max_distance_pixels` を超えても対応付けは行い、信頼度を下げて
    /// フラグを立てるだけにする。セクションが一つもなければ `Unassigned`。
    pub fn locate(&self, page: u32, bbox: &BBox) -> crate::error::Result<(SectionRef, Association)> {
        if self.index.is_empty() {
            return Ok((SectionRef::Unassigned, Association::unassigned()));
        }

        let layout = self.layout(page).ok_or_else(|| {
            FigureError::association(format!("no layout computed for page {page}"))
        })?;

        let y = bbox.y_min;
        let image_column = layout.column_of(bbox);
        let image_full_width = self.is_full_width(layout, bbox.x_min, bbox.x_max);

        let section = if layout.is_multi_column() {
            self.preceding_in_reading_order(layout, bbox)
                .map(SectionRef::Detected)
                .unwrap_or_else(|| self.last_of_earlier_pages(page))
        } else {
            match self.index.find_section_for_position(page, y) {
                SectionRef::Detected(i) if self.index.sections()[i].page == page => {
                    SectionRef::Detected(i)
                }
                _ => self.last_of_earlier_pages(page),
            }
        };

        let Some(s) = self.index.get(section) else {
            return Ok((SectionRef::Unassigned, Association::unassigned()));
        };

        let (distance, cross_column) = if s.page == page {
            let section_column = layout.column_of_x(s.position_x);
            let spans_columns = image_full_width || self.section_is_full_width(layout, s);
            if spans_columns || section_column == image_column {
                ((y - s.position_y).max(0.0), false)
            } else {
                ((y - s.position_y).abs() + self.settings.cross_column_penalty, true)
            }
        } else {
            let rest_of_section_page = self
                .layout(s.page)
                .map_or(0.0, |l| (l.height - s.position_y).max(0.0));
            let pages_between = (page - s.page - 1) as f64;
            (
                rest_of_section_page + pages_between * self.settings.page_distance_pixels + y.max(0.0),
                false,
            )
        };

        let association = self.score(distance, cross_column);
        debug!(
            page,
            section = %s.number,
            distance,
            confidence = association.confidence,
            "image associated"
        );
        Ok((section, association))
    }

    /// 距離の逆関数としての信頼度。上限距離を超えたら減衰させてフラグを立てる。
    fn score(&self, distance: f64, cross_column: bool) -> Association {
        let max = self.settings.max_distance_pixels;
        let mut confidence = max / (max + distance);
        let beyond_max_distance = distance > max;
        if beyond_max_distance {
            confidence *= self.settings.low_confidence_factor;
        }
        Association {
            confidence,
            distance,
            cross_column,
            beyond_max_distance,
        }
    }

    /// 段組ページで段をまたぐ要素か。幅が閾値を超えるか、複数の列に重なるもの。
    fn is_full_width(&self, layout: &PageLayout, x_min: f64, x_max: f64) -> bool {
        layout.is_multi_column()
            && (x_max - x_min > layout.width * self.settings.spanning_width_ratio
                || layout.columns_overlapped(x_min, x_max) > 1)
    }

    fn section_is_full_width(&self, layout: &PageLayout, s: &Section) -> bool {
        self.is_full_width(layout, s.position_x, s.position_x + s.width())
    }

    /// ページ上の全幅見出しのy座標（帯の区切り）。
    fn band_separators(&self, layout: &PageLayout) -> Vec<f64> {
        let sections = self.index.sections();
        self.index
            .page_range(layout.page)
            .map(|i| &sections[i])
            .filter(|s| self.section_is_full_width(layout, s))
            .map(|s| s.position_y)
            .collect()
    }

    fn reading_key(&self, layout: &PageLayout, separators: &[f64], s: &Section) -> ReadingKey {
        let band = separators.iter().filter(|&&sep| sep <= s.position_y).count();
        let column = if self.section_is_full_width(layout, s) {
            0
        } else {
            layout.column_of_x(s.position_x)
        };
        (band, column, s.position_y)
    }

    /// 同じページで読み順が画像より前にあるセクションのうち最後のもの。
    fn preceding_in_reading_order(&self, layout: &PageLayout, bbox: &BBox) -> Option<usize> {
        let sections = self.index.sections();
        let separators = self.band_separators(layout);
        let y = bbox.y_min;

        // 全幅の図の前にあるのは、それより上の内容だけ
        let limit = (!self.is_full_width(layout, bbox.x_min, bbox.x_max)).then(|| {
            let band = separators.iter().filter(|&&sep| sep <= y).count();
            (band, layout.column_of(bbox), y)
        });

        self.index
            .page_range(layout.page)
            .map(|i| (i, self.reading_key(layout, &separators, &sections[i])))
            .filter(|(i, key)| match &limit {
                Some(limit) => cmp_key(key, limit).is_lt(),
                None => sections[*i].position_y < y,
            })
            .max_by(|a, b| cmp_key(&a.1, &b.1))
            .map(|(i, _)| i)
    }

    /// ページ上で読み順が最後のセクション。
    fn last_in_reading_order(&self, layout: &PageLayout) -> Option<usize> {
        let sections = self.index.sections();
        let separators = self.band_separators(layout);
        self.index
            .page_range(layout.page)
            .map(|i| (i, self.reading_key(layout, &separators, &sections[i])))
            .max_by(|a, b| cmp_key(&a.1, &b.1))
            .map(|(i, _)| i)
    }

    /// 前のページのうち、読み順で最後のセクション。
    fn last_of_earlier_pages(&self, page: u32) -> SectionRef {
        let SectionRef::Detected(last) = self.index.last_before_page(page) else {
            return SectionRef::Unassigned;
        };
        let previous_page = self.index.sections()[last].page;

        match self.layout(previous_page) {
            Some(layout) if layout.is_multi_column() => self
                .last_in_reading_order(layout)
                .map_or(SectionRef::Detected(last), SectionRef::Detected),
            _ => SectionRef::Detected(last),
        }
    }
}
