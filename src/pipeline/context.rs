use std::sync::Arc;

use crate::analysis::adaptive::DocumentPattern;
use crate::analysis::pattern::PatternSet;
use crate::config::settings::Settings;
use crate::error::FigureError;

/// 1文書の処理に必要な設定、コンパイル済みパターン、ワーカープール。
///
/// 各段階へ明示的に渡す。グローバルな状態は持たない。
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub patterns: PatternSet,
    /// 文書から学習した見出しの傾向（適応的な検出が有効な場合のみ）
    pub learned: Option<DocumentPattern>,
    /// `parallel_workers > 0` のときの専用プール。Noneならrayonのグローバルプール。
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Context {
    /// 設定を検証し、セクション番号のパターンをコンパイルする。
    ///
    /// どちらかに失敗した場合は `ConfigError`（致命的）。
    pub fn new(settings: Settings) -> crate::error::Result<Self> {
        settings.validate()?;
        let patterns = PatternSet::compile(&settings.section_patterns)?;
        let pool = match settings.parallel_workers {
            0 => None,
            workers => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| FigureError::config(format!("failed to build worker pool: {e}")))?,
            )),
        };
        Ok(Self {
            settings,
            patterns,
            learned: None,
            pool,
        })
    }

    /// 学習した傾向で検出条件を調整したコンテキストを返す。
    ///
    /// 確信度が閾値以下ならNone（元の設定のまま処理する）。
    /// パターンとワーカープールは共有する。
    pub fn adapted(&self, pattern: DocumentPattern) -> Option<Self> {
        let settings = pattern.adapt(&self.settings)?;
        Some(Self {
            settings,
            patterns: self.patterns.clone(),
            learned: Some(pattern),
            pool: self.pool.clone(),
        })
    }

    /// 並列処理を設定されたプールで実行する。
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
