use serde::Serialize;

/// A detected numbered heading, anchored to a page and a vertical position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub number: String,
    pub title: String,
    /// 0-based page index.
    pub page: u32,
    /// Top of the numbering line.
    pub position_y: f64,
    /// Left edge of the numbering line, used for column membership.
    pub position_x: f64,
    /// Right edge of the heading (number and title lines together).
    pub right_x: f64,
    pub confidence: f64,
    /// Index of the configured pattern that matched the number.
    pub pattern_index: usize,
}

impl Section {
    /// Ordering key of the section sequence.
    pub fn key(&self) -> (u32, f64) {
        (self.page, self.position_y)
    }

    pub fn width(&self) -> f64 {
        (self.right_x - self.position_x).max(0.0)
    }
}

/// Reference from an image to the section it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectionRef {
    /// No section precedes the image anywhere in the document.
    #[default]
    Unassigned,
    /// Index into the document's ordered section list.
    Detected(usize),
}

impl SectionRef {
    pub fn index(self) -> Option<usize> {
        match self {
            SectionRef::Unassigned => None,
            SectionRef::Detected(i) => Some(i),
        }
    }
}
