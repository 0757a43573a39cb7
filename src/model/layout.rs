use serde::Serialize;

use super::geometry::BBox;

/// 水平方向の列範囲 [x_min, x_max)。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnBounds {
    pub x_min: f64,
    pub x_max: f64,
}

/// 垂直方向の帯 [y_min, y_max]。ヘッダ/フッタ除外帯に使う。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub y_min: f64,
    pub y_max: f64,
}

/// ページのレイアウト情報。ページごとに一度だけ計算され、以後は読み取り専用。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    pub page: u32,
    pub width: f64,
    pub height: f64,
    /// 左から右の順に並んだ列。少なくとも1列を含む。
    pub columns: Vec<ColumnBounds>,
    pub header_band: Band,
    pub footer_band: Band,
}

impl PageLayout {
    /// ページ全幅を1列とするレイアウト。
    pub fn single_column(page: u32, width: f64, height: f64, header: Band, footer: Band) -> Self {
        Self {
            page,
            width,
            height,
            columns: vec![ColumnBounds {
                x_min: 0.0,
                x_max: width,
            }],
            header_band: header,
            footer_band: footer,
        }
    }

    pub fn is_multi_column(&self) -> bool {
        self.columns.len() > 1
    }

    /// x座標が属する列のインデックス。どの列にも含まれない場合は最も近い列。
    pub fn column_of_x(&self, x: f64) -> usize {
        if let Some(i) = self
            .columns
            .iter()
            .position(|c| x >= c.x_min && x < c.x_max)
        {
            return i;
        }

        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let d = if x < c.x_min { c.x_min - x } else { x - c.x_max };
                (i, d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// 横方向の範囲 [x_min, x_max] が重なる列の数。
    pub fn columns_overlapped(&self, x_min: f64, x_max: f64) -> usize {
        self.columns
            .iter()
            .filter(|c| x_min < c.x_max && x_max > c.x_min)
            .count()
    }

    /// 矩形の中心xが属する列。
    pub fn column_of(&self, bbox: &BBox) -> usize {
        self.column_of_x(bbox.center_x())
    }

    /// 矩形全体がヘッダ帯の内側にあるか。
    pub fn in_header(&self, bbox: &BBox) -> bool {
        bbox.y_min >= self.header_band.y_min && bbox.y_max <= self.header_band.y_max
    }

    /// 矩形全体がフッタ帯の内側にあるか。
    pub fn in_footer(&self, bbox: &BBox) -> bool {
        bbox.y_min >= self.footer_band.y_min && bbox.y_max <= self.footer_band.y_max
    }
}
