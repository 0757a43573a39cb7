// セクション番号パターン: 設定順に評価し、最初に一致したものを採用する

use regex::Regex;

/// Ordered list of precompiled section-numbering matchers.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile `sources` in order. An invalid pattern is a configuration error.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> crate::error::Result<Self> {
        let patterns = sources
            .iter()
            .map(|s| {
                Regex::new(s.as_ref()).map_err(|e| {
                    crate::error::FigureError::config(format!(
                        "invalid section pattern '{}': {e}",
                        s.as_ref()
                    ))
                })
            })
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Index of the first pattern matching at the start of `text`.
    ///
    /// Patterns after the first hit are not evaluated.
    pub fn first_match(&self, text: &str) -> Option<usize> {
        self.patterns
            .iter()
            .position(|re| re.find(text).is_some_and(|m| m.start() == 0))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
