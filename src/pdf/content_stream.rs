use lopdf::content::Content;

use crate::error::FigureError;
use crate::model::BBox;

/// 6要素アフィン変換行列 [a, b, c, d, e, f]
/// PDF仕様: [ a b 0 ]
///          [ c d 0 ]
///          [ e f 1 ]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    /// 単位行列を返す。
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// 平行移動行列。
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::identity()
        }
    }

    /// オペランド6個から行列を作る。
    pub fn from_operands(operands: &[lopdf::Object]) -> crate::error::Result<Self> {
        let vals: Vec<f64> = operands
            .iter()
            .map(operand_to_f64)
            .collect::<Result<Vec<_>, _>>()?;
        match vals.as_slice() {
            &[a, b, c, d, e, f] => Ok(Self { a, b, c, d, e, f }),
            _ => Err(FigureError::pdf_read(format!(
                "expected 6 matrix operands, got {}",
                vals.len()
            ))),
        }
    }

    /// self * other (行列の右乗算)
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// 点 (x, y) を変換する。
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// 縦方向の拡大率。フォントサイズの実効値に使う。
    pub fn vertical_scale(&self) -> f64 {
        self.c.hypot(self.d)
    }
}

/// XObjectの配置情報。BBoxはPDFのユーザ空間（原点は左下）。
#[derive(Debug, Clone)]
pub struct XObjectPlacement {
    /// XObjectの名前 (e.g. "Im1")
    pub name: String,
    /// CTMから計算したBBox
    pub bbox: BBox,
}

/// コンテンツストリームをデコードする。空のストリームは操作なしとして扱う。
pub fn decode_content(content_bytes: &[u8]) -> crate::error::Result<Content> {
    if content_bytes.is_empty() {
        return Ok(Content { operations: vec![] });
    }
    Content::decode(content_bytes).map_err(|e| FigureError::pdf_read(e.to_string()))
}

/// コンテンツストリームを解析し、全XObjectの配置情報を出現順に抽出する。
///
/// CTMスタック(q/Q)を追跡し、cmオペレータでCTMを更新する。
/// DoオペレータでXObject名とその時点のCTM・BBoxを記録する。
pub fn extract_xobject_placements(
    content_bytes: &[u8],
) -> crate::error::Result<Vec<XObjectPlacement>> {
    let content = decode_content(content_bytes)?;

    let mut ctm_stack: Vec<Matrix> = vec![Matrix::identity()];
    let mut placements: Vec<XObjectPlacement> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => {
                let current = ctm_stack.last().cloned().unwrap_or_else(Matrix::identity);
                ctm_stack.push(current);
            }
            "Q" => {
                if ctm_stack.len() > 1 {
                    ctm_stack.pop();
                }
            }
            "cm" => {
                if op.operands.len() == 6 {
                    let cm = Matrix::from_operands(&op.operands)?;
                    if let Some(current) = ctm_stack.last_mut() {
                        *current = cm.multiply(current);
                    }
                }
            }
            "Do" => {
                if let Some(operand) = op.operands.first() {
                    let name_bytes = operand
                        .as_name()
                        .map_err(|e| FigureError::pdf_read(e.to_string()))?;
                    let name = String::from_utf8_lossy(name_bytes).into_owned();
                    let ctm = ctm_stack.last().cloned().unwrap_or_else(Matrix::identity);
                    placements.push(XObjectPlacement {
                        name,
                        bbox: ctm_to_bbox(&ctm),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(placements)
}

/// lopdfのObjectから数値をf64として取得する。
pub fn operand_to_f64(obj: &lopdf::Object) -> crate::error::Result<f64> {
    match obj {
        lopdf::Object::Integer(i) => Ok(*i as f64),
        lopdf::Object::Real(r) => Ok(f64::from(*r)),
        _ => Err(FigureError::pdf_read(format!(
            "expected numeric operand, got {:?}",
            obj
        ))),
    }
}

/// CTMからBBoxを計算する。
/// 単位正方形 [0,0]-[1,1] の4頂点をCTMで変換し、min/maxを取る。
fn ctm_to_bbox(ctm: &Matrix) -> BBox {
    let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(x, y)| ctm.apply(x, y));

    let x_min = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let y_min = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let x_max = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_max = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    BBox::new(x_min, y_min, x_max, y_max)
}
