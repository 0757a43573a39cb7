// 命名規則: PREFIX-MANUAL-SECTION[ n_INDEX].ext

use std::collections::HashMap;

use serde::Serialize;

use crate::config::settings::Settings;
use crate::model::{ImageId, ImageRecord, Section};

/// 命名に使う固定部分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub prefix: String,
    pub manual: String,
    /// 対応するセクションがない画像のグループ名
    pub unassigned_label: String,
}

impl NamingScheme {
    pub fn new(
        prefix: impl Into<String>,
        manual: impl Into<String>,
        unassigned_label: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            manual: manual.into(),
            unassigned_label: unassigned_label.into(),
        }
    }

    pub fn from_settings(settings: &Settings, manual: impl Into<String>) -> Self {
        Self::new(
            settings.prefix.clone(),
            manual,
            settings.unassigned_label.clone(),
        )
    }

    /// グループ内の画像数が1なら番号なし、2以上なら ` n_INDEX` を付ける。
    pub fn filename(&self, section_label: &str, index: Option<u32>, ext: &str) -> String {
        let prefix = sanitize_component(&self.prefix);
        let manual = sanitize_component(&self.manual);
        let label = sanitize_component(section_label);
        match index {
            Some(i) => format!("{prefix}-{manual}-{label} n_{i}.{ext}"),
            None => format!("{prefix}-{manual}-{label}.{ext}"),
        }
    }
}

/// 採用画像1件分の命名結果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedName {
    pub id: ImageId,
    pub section_label: String,
    /// グループ内の1始まりの順番。グループが1件のみならNone。
    pub index: Option<u32>,
    pub filename: String,
}

/// 採用済みの画像をセクションごとにまとめ、正規のファイル名を割り当てる。
///
/// グループはファイル名に使う形（`_` 置換後）のセクション番号で作るため、
/// 同じ番号が複数回検出されても、置換後に同じ綴りになる番号同士でも
/// ファイル名は衝突しない。各グループは (page, y, x) 順に番号付けする。
/// 入力のみに依存する純関数で、結果はページ/位置順に並ぶ。
pub fn assign_names(
    records: &[ImageRecord],
    sections: &[Section],
    scheme: &NamingScheme,
) -> Vec<AssignedName> {
    let mut accepted: Vec<&ImageRecord> = records.iter().filter(|r| r.is_accepted()).collect();
    accepted.sort_by(|a, b| a.position_cmp(b));

    let labels: Vec<String> = accepted
        .iter()
        .map(|record| {
            let label = record
                .section
                .index()
                .and_then(|i| sections.get(i))
                .map_or(scheme.unassigned_label.as_str(), |s| s.number.as_str());
            sanitize_component(label)
        })
        .collect();

    let mut group_sizes: HashMap<&str, u32> = HashMap::new();
    for label in &labels {
        *group_sizes.entry(label.as_str()).or_default() += 1;
    }

    let mut next_index: HashMap<&str, u32> = HashMap::new();
    accepted
        .iter()
        .zip(&labels)
        .map(|(record, label)| {
            let counter = next_index.entry(label.as_str()).or_default();
            *counter += 1;
            let index = (group_sizes[label.as_str()] > 1).then_some(*counter);
            let ext = record
                .image
                .as_ref()
                .map_or("bin", |image| image.format.as_str());
            AssignedName {
                id: record.id,
                section_label: label.clone(),
                index,
                filename: scheme.filename(label, index, ext),
            }
        })
        .collect()
}

/// ファイル名として扱えない文字を `_` に置き換える。
fn sanitize_component(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_single() {
        let scheme = NamingScheme::new("CRL", "PROCSG02", "0");
        assert_eq!(scheme.filename("1.2", None, "png"), "CRL-PROCSG02-1.2.png");
    }

    #[test]
    fn test_filename_indexed() {
        let scheme = NamingScheme::new("CRL", "PROCSG02", "0");
        assert_eq!(
            scheme.filename("1.2", Some(3), "jpeg"),
            "CRL-PROCSG02-1.2 n_3.jpeg"
        );
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("A/B\\C"), "A_B_C");
        assert_eq!(sanitize_component(" 1.2 "), "1.2");
    }
}
