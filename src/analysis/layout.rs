// レイアウト解析: 列境界とヘッダ/フッタ帯

use tracing::debug;

use crate::config::settings::Settings;
use crate::model::{BBox, Band, ColumnBounds, PageLayout, TextLine};

/// x方向に連続した内容の塊
#[derive(Debug, Clone)]
struct Cluster {
    x_min: f64,
    x_max: f64,
    text_items: usize,
}

pub struct LayoutAnalyzer<'a> {
    settings: &'a Settings,
}

impl<'a> LayoutAnalyzer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// ページのテキスト行と画像矩形から列とヘッダ/フッタ帯を求める。
    ///
    /// 結果は参考情報であり、内容を直接除外することはない。
    /// テキストを含まないページはページ全幅の1列になる。
    pub fn analyze(
        &self,
        page: u32,
        width: f64,
        height: f64,
        lines: &[TextLine],
        images: &[BBox],
    ) -> PageLayout {
        let (header, footer) = self.bands(height);
        let width = if width.is_finite() && width > 0.0 {
            width
        } else {
            content_right_edge(lines, images)
        };

        let columns = self.detect_columns(width, lines, images);
        debug!(page, columns = columns.len(), "page layout");

        PageLayout {
            page,
            width,
            height,
            columns,
            header_band: header,
            footer_band: footer,
        }
    }

    /// ページ高さの比率で切り出したヘッダ帯とフッタ帯。
    pub fn bands(&self, height: f64) -> (Band, Band) {
        let height = if height.is_finite() && height > 0.0 { height } else { 0.0 };
        let header = Band {
            y_min: 0.0,
            y_max: height * self.settings.header_ratio,
        };
        let footer = Band {
            y_min: height * (1.0 - self.settings.footer_ratio),
            y_max: height,
        };
        (header, footer)
    }

    fn detect_columns(&self, width: f64, lines: &[TextLine], images: &[BBox]) -> Vec<ColumnBounds> {
        let full_page = vec![ColumnBounds {
            x_min: 0.0,
            x_max: width,
        }];

        // 段をまたぐ要素（全幅の見出しや図）は列の判定から除く
        let span_limit = width * self.settings.spanning_width_ratio;
        let mut items: Vec<(f64, f64, bool)> = lines
            .iter()
            .map(|l| (l.bbox, true))
            .chain(images.iter().map(|b| (*b, false)))
            .filter(|(b, _)| b.is_well_formed() && b.width() <= span_limit)
            .map(|(b, is_text)| (b.x_min, b.x_max, is_text))
            .collect();

        if !items.iter().any(|(_, _, is_text)| *is_text) {
            return full_page;
        }

        items.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));

        let mut clusters: Vec<Cluster> = Vec::new();
        for (x_min, x_max, is_text) in items {
            match clusters.last_mut() {
                Some(current) if x_min - current.x_max <= self.settings.min_gap_width => {
                    current.x_max = current.x_max.max(x_max);
                    current.text_items += usize::from(is_text);
                }
                _ => clusters.push(Cluster {
                    x_min,
                    x_max,
                    text_items: usize::from(is_text),
                }),
            }
        }

        merge_weak_clusters(&mut clusters, self.settings.min_lines_per_column);

        if clusters.len() < 2 {
            return full_page;
        }

        let last = clusters.len() - 1;
        clusters
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let x_min = if i == 0 {
                    c.x_min.min(0.0)
                } else {
                    (clusters[i - 1].x_max + c.x_min) / 2.0
                };
                let x_max = if i == last {
                    c.x_max.max(width)
                } else {
                    (c.x_max + clusters[i + 1].x_min) / 2.0
                };
                ColumnBounds { x_min, x_max }
            })
            .collect()
    }
}

/// テキスト行数が閾値未満の塊を、間隔の狭い方の隣へ併合する。
fn merge_weak_clusters(clusters: &mut Vec<Cluster>, min_lines: usize) {
    while clusters.len() > 1 {
        let Some(i) = clusters.iter().position(|c| c.text_items < min_lines) else {
            break;
        };

        let gap_left = (i > 0).then(|| clusters[i].x_min - clusters[i - 1].x_max);
        let gap_right = clusters
            .get(i + 1)
            .map(|next| next.x_min - clusters[i].x_max);

        let target = match (gap_left, gap_right) {
            (Some(l), Some(r)) if r < l => i + 1,
            (Some(_), _) => i - 1,
            (None, _) => i + 1,
        };

        let weak = clusters.remove(i);
        let target = if target > i { target - 1 } else { target };
        let merged = &mut clusters[target];
        merged.x_min = merged.x_min.min(weak.x_min);
        merged.x_max = merged.x_max.max(weak.x_max);
        merged.text_items += weak.text_items;
    }
}

fn content_right_edge(lines: &[TextLine], images: &[BBox]) -> f64 {
    lines
        .iter()
        .map(|l| l.bbox)
        .chain(images.iter().copied())
        .filter(BBox::is_well_formed)
        .map(|b| b.x_max)
        .fold(0.0, f64::max)
}
