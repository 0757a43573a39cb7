// コンテンツストリームからテキスト行を抽出する
//
// グリフ幅は扱わず、1文字あたり 0.5em の概算幅で送り量と行幅を見積もる。

use std::collections::HashMap;

use crate::model::{BBox, TextLine};
use crate::pdf::content_stream::{Matrix, decode_content, operand_to_f64};

/// 概算の文字幅（em単位）
const APPROX_CHAR_WIDTH_EM: f64 = 0.5;
/// ベースラインからの上端（em単位）
const ASCENT_EM: f64 = 1.0;
/// ベースラインからの下端（em単位）
const DESCENT_EM: f64 = 0.2;
/// 同じ行とみなすベースラインの差（em単位）
const BASELINE_TOLERANCE_EM: f64 = 0.5;
/// これより広い水平方向の隙間で行を分割する（em単位）
const LINE_SPLIT_GAP_EM: f64 = 2.0;
/// これより広い隙間には空白を補う（em単位）
const WORD_GAP_EM: f64 = 0.25;

/// 1回のTj/TJ/'/"で描画された文字列。座標はPDFのユーザ空間（原点は左下）。
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub baseline: f64,
    pub width: f64,
    /// 実効フォントサイズ（Tf × 行列の縦方向拡大率）
    pub font_size: f64,
    /// /Font リソース名 (e.g. "F1")
    pub font_resource: String,
}

/// BT...ET内のテキスト状態
struct TextState {
    font_resource: String,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scaling: f64,
    text_rise: f64,
    text_leading: f64,
    text_matrix: Matrix,
    text_line_matrix: Matrix,
}

impl TextState {
    fn new() -> Self {
        TextState {
            font_resource: String::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            text_rise: 0.0,
            text_leading: 0.0,
            text_matrix: Matrix::identity(),
            text_line_matrix: Matrix::identity(),
        }
    }

    /// Td: 行列の原点を (tx, ty) 移動して新しい行を始める
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.text_line_matrix = Matrix::translate(tx, ty).multiply(&self.text_line_matrix);
        self.text_matrix = self.text_line_matrix.clone();
    }

    /// T* オペレータ: 0 -TL Td と等価
    fn apply_t_star(&mut self) {
        self.move_line(0.0, -self.text_leading);
    }

    /// 文字列を描画した扱いで送り量だけテキスト行列を進め、描画した範囲を返す。
    fn show(&mut self, text: String, ctm: &Matrix) -> Option<TextRun> {
        let char_count = text.chars().count();
        let spaces = text.chars().filter(|c| *c == ' ').count();
        let scale = self.horizontal_scaling / 100.0;
        let advance = (char_count as f64 * (APPROX_CHAR_WIDTH_EM * self.font_size + self.char_spacing)
            + spaces as f64 * self.word_spacing)
            * scale;

        let rendering = self.text_matrix.multiply(ctm);
        let (x0, y0) = rendering.apply(0.0, self.text_rise);
        let (x1, _) = rendering.apply(advance, self.text_rise);
        let font_size = self.font_size * rendering.vertical_scale();

        self.adjust(advance);

        if text.trim().is_empty() {
            return None;
        }
        Some(TextRun {
            text,
            x: x0.min(x1),
            baseline: y0,
            width: (x1 - x0).abs(),
            font_size,
            font_resource: self.font_resource.clone(),
        })
    }

    /// テキスト空間でx方向に移動する。
    fn adjust(&mut self, tx: f64) {
        self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
    }
}

/// コンテンツストリームを解析し、描画された文字列を出現順に返す。
pub fn extract_text_runs(content_bytes: &[u8]) -> crate::error::Result<Vec<TextRun>> {
    let content = decode_content(content_bytes)?;

    let mut runs = Vec::new();
    let mut ctm_stack: Vec<Matrix> = vec![Matrix::identity()];
    let mut in_text = false;
    let mut ts = TextState::new();

    for op in &content.operations {
        let ctm = ctm_stack.last().cloned().unwrap_or_else(Matrix::identity);
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
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

            "BT" => {
                in_text = true;
                ts.text_matrix = Matrix::identity();
                ts.text_line_matrix = Matrix::identity();
            }
            "ET" => in_text = false,

            // Tf/TL/Tc/Tw/Tz/Ts はテキスト状態のためBT外でも有効
            "Tf" => {
                if op.operands.len() == 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        ts.font_resource = String::from_utf8_lossy(name).into_owned();
                    }
                    if let Ok(size) = operand_to_f64(&op.operands[1]) {
                        ts.font_size = size;
                    }
                }
            }
            "TL" => {
                if let Some(v) = op.operands.first() {
                    ts.text_leading = operand_to_f64(v)?;
                }
            }
            "Tc" => {
                if let Some(v) = op.operands.first() {
                    ts.char_spacing = operand_to_f64(v)?;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first() {
                    ts.word_spacing = operand_to_f64(v)?;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first() {
                    ts.horizontal_scaling = operand_to_f64(v)?;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first() {
                    ts.text_rise = operand_to_f64(v)?;
                }
            }

            "Tm" if in_text => {
                if op.operands.len() == 6 {
                    let m = Matrix::from_operands(&op.operands)?;
                    ts.text_matrix = m.clone();
                    ts.text_line_matrix = m;
                }
            }
            "Td" if in_text => {
                if op.operands.len() == 2 {
                    let tx = operand_to_f64(&op.operands[0])?;
                    let ty = operand_to_f64(&op.operands[1])?;
                    ts.move_line(tx, ty);
                }
            }
            "TD" if in_text => {
                // tx ty TD = -ty TL tx ty Td
                if op.operands.len() == 2 {
                    let tx = operand_to_f64(&op.operands[0])?;
                    let ty = operand_to_f64(&op.operands[1])?;
                    ts.text_leading = -ty;
                    ts.move_line(tx, ty);
                }
            }
            "T*" if in_text => ts.apply_t_star(),

            "Tj" if in_text => {
                if let Some(lopdf::Object::String(bytes, _)) = op.operands.first() {
                    runs.extend(ts.show(decode_pdf_string(bytes), &ctm));
                }
            }
            "TJ" if in_text => {
                if let Some(lopdf::Object::Array(items)) = op.operands.first() {
                    let start = runs.len();
                    for item in items {
                        match item {
                            lopdf::Object::String(bytes, _) => {
                                runs.extend(ts.show(decode_pdf_string(bytes), &ctm));
                            }
                            lopdf::Object::Integer(_) | lopdf::Object::Real(_) => {
                                let adj = operand_to_f64(item)?;
                                let scale = ts.horizontal_scaling / 100.0;
                                ts.adjust(-adj / 1000.0 * ts.font_size * scale);
                            }
                            _ => {}
                        }
                    }
                    // TJ配列の断片は1つの文字列にまとめる
                    merge_runs_from(&mut runs, start);
                }
            }
            "'" if in_text => {
                // ' = T* string Tj
                ts.apply_t_star();
                if let Some(lopdf::Object::String(bytes, _)) = op.operands.first() {
                    runs.extend(ts.show(decode_pdf_string(bytes), &ctm));
                }
            }
            "\"" if in_text => {
                // aw ac string " = aw Tw ac Tc T* string Tj
                if op.operands.len() == 3 {
                    if let Ok(aw) = operand_to_f64(&op.operands[0]) {
                        ts.word_spacing = aw;
                    }
                    if let Ok(ac) = operand_to_f64(&op.operands[1]) {
                        ts.char_spacing = ac;
                    }
                    ts.apply_t_star();
                    if let lopdf::Object::String(bytes, _) = &op.operands[2] {
                        runs.extend(ts.show(decode_pdf_string(bytes), &ctm));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

/// runs[start..] を1つの文字列に結合する。
fn merge_runs_from(runs: &mut Vec<TextRun>, start: usize) {
    if runs.len() <= start + 1 {
        return;
    }
    let tail: Vec<TextRun> = runs.drain(start..).collect();
    let mut merged = tail[0].clone();
    for run in &tail[1..] {
        let gap = run.x - (merged.x + merged.width);
        if gap > WORD_GAP_EM * merged.font_size && !merged.text.ends_with(' ') {
            merged.text.push(' ');
        }
        merged.text.push_str(&run.text);
        let right = (run.x + run.width).max(merged.x + merged.width);
        merged.x = merged.x.min(run.x);
        merged.width = right - merged.x;
    }
    runs.push(merged);
}

/// 文字列を行にまとめ、ページ座標系（原点は左上、yは下向き）のTextLineにする。
///
/// ベースラインが近い文字列を同じ行とし、大きな水平方向の隙間で分割する。
/// 行の順序は、その行の最初の文字列のストリーム内の出現順。
pub fn group_into_lines(
    runs: &[TextRun],
    page_box: &BBox,
    font_names: &HashMap<String, String>,
) -> Vec<TextLine> {
    // (出現順, run) をベースラインの高い順、x の小さい順に並べる
    let mut order: Vec<usize> = (0..runs.len()).collect();
    order.sort_by(|&a, &b| {
        runs[b]
            .baseline
            .total_cmp(&runs[a].baseline)
            .then(runs[a].x.total_cmp(&runs[b].x))
            .then(a.cmp(&b))
    });

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in order {
        let run = &runs[i];
        let tolerance = BASELINE_TOLERANCE_EM * run.font_size.max(1.0);
        match groups.last_mut() {
            Some(group)
                if group.last().is_some_and(|&j| {
                    let prev = &runs[j];
                    (prev.baseline - run.baseline).abs() <= tolerance
                        && run.x >= prev.x
                        && run.x - (prev.x + prev.width) <= LINE_SPLIT_GAP_EM * prev.font_size
                }) =>
            {
                group.push(i);
            }
            _ => groups.push(vec![i]),
        }
    }

    // 各グループの最初の出現位置でストリーム順に並べ直す
    groups.sort_by_key(|g| g.iter().copied().min().unwrap_or(usize::MAX));

    groups
        .iter()
        .filter_map(|group| build_line(runs, group, page_box, font_names))
        .collect()
}

fn build_line(
    runs: &[TextRun],
    group: &[usize],
    page_box: &BBox,
    font_names: &HashMap<String, String>,
) -> Option<TextLine> {
    let first = &runs[*group.first()?];

    let mut text = String::new();
    let mut right = f64::NEG_INFINITY;
    for &i in group {
        let run = &runs[i];
        if !text.is_empty() && run.x - right > WORD_GAP_EM * run.font_size && !text.ends_with(' ') {
            text.push(' ');
        }
        text.push_str(&run.text);
        right = right.max(run.x + run.width);
    }
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let font_size = group
        .iter()
        .map(|&i| runs[i].font_size)
        .fold(0.0, f64::max);
    let x_min = group.iter().map(|&i| runs[i].x).fold(f64::INFINITY, f64::min);
    let top = group
        .iter()
        .map(|&i| runs[i].baseline + ASCENT_EM * runs[i].font_size)
        .fold(f64::NEG_INFINITY, f64::max);
    let bottom = group
        .iter()
        .map(|&i| runs[i].baseline - DESCENT_EM * runs[i].font_size)
        .fold(f64::INFINITY, f64::min);

    let font_name_of = |resource: &str| {
        font_names
            .get(resource)
            .cloned()
            .unwrap_or_else(|| resource.to_string())
    };
    let is_bold = group
        .iter()
        .all(|&i| is_bold_font_name(&font_name_of(&runs[i].font_resource)));

    // PDF空間(左下原点) → ページ座標(左上原点)
    let bbox = BBox::new(
        x_min - page_box.x_min,
        page_box.y_max - top,
        right - page_box.x_min,
        page_box.y_max - bottom,
    );

    Some(
        TextLine::new(text, bbox, font_size, is_bold)
            .with_font_name(font_name_of(&first.font_resource)),
    )
}

/// フォント名から太字かどうかを判定する。
pub fn is_bold_font_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["bold", "black", "heavy"].iter().any(|w| lower.contains(w))
}

/// PDF文字列をデコードする。BOM付きUTF-16BE、それ以外はLatin-1として扱う。
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}
