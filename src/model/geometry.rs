use serde::{Deserialize, Serialize};

/// ページ座標系の矩形。原点はページ左上、yは下向きに増加する。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f64 {
        (self.x_min + self.x_max) / 2.0
    }

    /// 全座標が有限値で、かつ min <= max を満たすか。
    pub fn is_well_formed(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }

    /// 幅/高さ。高さが0の場合はNone。
    pub fn aspect_ratio(&self) -> Option<f64> {
        let h = self.height();
        if h > 0.0 { Some(self.width() / h) } else { None }
    }
}
