// 画像の種類の推定（矩形の大きさ・縦横比・余白位置による）
//
// 推定結果はレポート用の情報で、採否には影響しない。

use serde::Serialize;

use crate::model::{BBox, PageLayout};

/// 大きい画像とみなす面積
const LARGE_AREA: f64 = 50_000.0;
/// 中くらいの画像とみなす面積
const MEDIUM_AREA: f64 = 10_000.0;
/// 極端な縦横比の小片とみなす面積
const SLIVER_AREA: f64 = 5_000.0;
/// ページ端からこの比率以内を余白とする
const MARGIN_RATIO: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Diagram,
    Chart,
    Photo,
    Logo,
    Decoration,
    #[default]
    Unknown,
}

/// 矩形の形状から画像の種類を推定する。
///
/// 余白にかかる小さな画像は装飾とみなす。高さ0の矩形は縦横比1として扱う。
pub fn classify(bbox: &BBox, layout: &PageLayout) -> ImageType {
    let area = bbox.area();
    let ratio = bbox.aspect_ratio().unwrap_or(1.0);

    let by_shape = by_shape(area, ratio);
    if by_shape == ImageType::Decoration {
        return by_shape;
    }
    if area < SLIVER_AREA && !(0.2..=5.0).contains(&ratio) {
        return ImageType::Decoration;
    }
    if area < MEDIUM_AREA && touches_margin(bbox, layout) {
        return ImageType::Decoration;
    }
    by_shape
}

fn by_shape(area: f64, ratio: f64) -> ImageType {
    if !(0.25..=4.0).contains(&ratio) {
        ImageType::Decoration
    } else if area > LARGE_AREA {
        if (0.5..=2.0).contains(&ratio) {
            ImageType::Diagram
        } else if ratio > 2.0 {
            ImageType::Chart
        } else {
            ImageType::Unknown
        }
    } else if area > MEDIUM_AREA {
        if (0.8..=1.5).contains(&ratio) {
            ImageType::Photo
        } else {
            ImageType::Diagram
        }
    } else if !(0.3..=3.0).contains(&ratio) {
        ImageType::Decoration
    } else {
        ImageType::Logo
    }
}

fn touches_margin(bbox: &BBox, layout: &PageLayout) -> bool {
    let (w, h) = (layout.width, layout.height);
    if w <= 0.0 || h <= 0.0 {
        return false;
    }
    bbox.x_min < w * MARGIN_RATIO
        || bbox.x_max > w * (1.0 - MARGIN_RATIO)
        || bbox.y_min < h * MARGIN_RATIO
        || bbox.y_max > h * (1.0 - MARGIN_RATIO)
}
