// マニュアル名の推定: フッタ → 文書タイトル → ファイル名 の順に試す

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// フッタ・タイトル中のマニュアル名候補
static CANDIDATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b([A-Z]{2,}SG\d+)\b",
        r"\b([A-Z]{3,}\d+)\b",
        r"\b([A-Z]{2,}-[A-Z]{2,})\b",
        r"\b([A-Z]{2,}/[A-Z]{2,})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("manual name pattern must compile"))
    .collect()
});

/// ファイル名先頭から取り出すパターン
static FILENAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^([A-Z]+\d+)", r"^([A-Z]{2,})", r"^(\w+?)[-_]"]
        .iter()
        .map(|p| Regex::new(p).expect("filename pattern must compile"))
        .collect()
});

/// 年号・ページ番号・版数などの誤検出
static FALSE_POSITIVES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\d{4}$",
        r"^PAGE\d*$",
        r"^REV\d*$",
        r"^VER\d*$",
        r"^DOC\d*$",
        r"^\d{1,3}$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("false positive pattern must compile"))
    .collect()
});

const FALLBACK_LENGTH: usize = 10;

/// マニュアル名を推定する。
///
/// 1. フッタのテキスト（先頭数ページ分）
/// 2. 文書タイトル
/// 3. ファイル名のパターン
/// 4. ファイル名の先頭10文字を大文字化したもの
pub fn deduce_manual_name(footer_texts: &[String], title: Option<&str>, file_stem: &str) -> String {
    if let Some(name) = footer_texts.iter().find_map(|t| find_candidate(t)) {
        debug!(%name, "manual name found in footer");
        return name;
    }

    if let Some(name) = title.and_then(find_candidate) {
        debug!(%name, "manual name found in document title");
        return name;
    }

    if let Some(name) = FILENAME_PATTERNS
        .iter()
        .find_map(|re| re.captures(file_stem))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    {
        debug!(%name, "manual name deduced from file name");
        return name;
    }

    let fallback: String = file_stem
        .chars()
        .take(FALLBACK_LENGTH)
        .collect::<String>()
        .to_uppercase();
    if fallback.is_empty() {
        "MANUAL".to_string()
    } else {
        fallback
    }
}

/// テキスト中から最初に見つかった妥当な候補。
fn find_candidate(text: &str) -> Option<String> {
    CANDIDATE_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|name| is_plausible_manual_name(name))
            .map(str::to_string)
    })
}

/// 候補名がマニュアル名として妥当か。
pub fn is_plausible_manual_name(name: &str) -> bool {
    if FALSE_POSITIVES.iter().any(|re| re.is_match(name)) {
        return false;
    }
    let len = name.chars().count();
    if !(3..=15).contains(&len) {
        return false;
    }
    name.chars().any(|c| c.is_ascii_uppercase())
}
