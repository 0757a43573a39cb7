use serde::Deserialize;

use crate::error::FigureError;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    /// 抽出画像とレポートの出力ディレクトリ
    pub output: String,
    pub manual: Option<String>,
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "deserialize_pages")]
    pub pages: Option<Vec<u32>>,
    pub bold_required: Option<bool>,
    pub font_size_range: Option<[f64; 2]>,
    /// trueなら画像を書き出さず、命名計画だけをレポートに出す
    pub preview: Option<bool>,
}

/// ページ範囲文字列をパースしてページ番号のベクタに変換する。
///
/// 形式:
/// - 単一ページ: `"5"`
/// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - 混合（カンマ区切り）: `"1, 3, 5-10, 15"`
///
/// 結果はソート済み・重複なし。ページ番号は1始まり。
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(FigureError::config("Page range cannot be empty"));
    }

    let mut pages = Vec::new();

    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let start = parse_page_number(start_str)?;
            let end = parse_page_number(end_str)?;

            if start > end {
                return Err(FigureError::config(format!(
                    "Invalid page range: start ({start}) > end ({end})"
                )));
            }

            pages.extend(start..=end);
        } else {
            pages.push(parse_page_number(part)?);
        }
    }

    if pages.is_empty() {
        return Err(FigureError::config("Page range resolved to empty set"));
    }

    pages.sort();
    pages.dedup();
    Ok(pages)
}

fn parse_page_number(s: &str) -> crate::error::Result<u32> {
    let page: u32 = s
        .trim()
        .parse()
        .map_err(|_| FigureError::config(format!("Invalid page number: '{}'", s.trim())))?;
    if page == 0 {
        return Err(FigureError::config("Page numbers start at 1"));
    }
    Ok(page)
}

/// serdeのdeserialize_withで使用するページ範囲デシリアライザ
fn deserialize_pages<'de, D>(deserializer: D) -> Result<Option<Vec<u32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| parse_page_range(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}
