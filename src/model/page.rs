use super::geometry::BBox;

/// One line of text as delivered by the PDF parser.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub bbox: BBox,
    pub font_size: f64,
    pub font_name: String,
    pub is_bold: bool,
}

impl TextLine {
    pub fn new(text: impl Into<String>, bbox: BBox, font_size: f64, is_bold: bool) -> Self {
        Self {
            text: text.into(),
            bbox,
            font_size,
            font_name: String::new(),
            is_bold,
        }
    }

    pub fn with_font_name(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }
}

/// An embedded image as delivered by the PDF parser, before normalization.
///
/// `read_error` is set when the parser located the image but could not
/// produce its byte stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedImage {
    pub bbox: Option<BBox>,
    pub data: Vec<u8>,
    pub format_hint: Option<String>,
    pub read_error: Option<String>,
}

impl EmbeddedImage {
    pub fn new(bbox: BBox, data: Vec<u8>, format_hint: impl Into<String>) -> Self {
        Self {
            bbox: Some(bbox),
            data,
            format_hint: Some(format_hint.into()),
            read_error: None,
        }
    }

    pub fn unreadable(bbox: Option<BBox>, reason: impl Into<String>) -> Self {
        Self {
            bbox,
            read_error: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// All parser output for a single page. `index` is 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct PageData {
    pub index: u32,
    pub width: f64,
    pub height: f64,
    pub lines: Vec<TextLine>,
    pub images: Vec<EmbeddedImage>,
}

impl PageData {
    pub fn new(index: u32, width: f64, height: f64) -> Self {
        Self {
            index,
            width,
            height,
            lines: Vec::new(),
            images: Vec::new(),
        }
    }

    /// A page that could not be read; it yields no sections and no images.
    pub fn empty(index: u32) -> Self {
        Self::new(index, 0.0, 0.0)
    }
}

/// Source of page data, read one page at a time.
pub trait PageSource {
    fn page_count(&self) -> crate::error::Result<u32>;

    /// Load page `index` (0-based).
    fn load_page(&self, index: u32) -> crate::error::Result<PageData>;
}

/// Pages are looked up by `PageData::index`, so the slice may be in any order.
/// The document spans up to the highest index; a gap below it is reported as an
/// unreadable page rather than silently skipped.
impl PageSource for [PageData] {
    fn page_count(&self) -> crate::error::Result<u32> {
        Ok(self.iter().map(|p| p.index + 1).max().unwrap_or(0))
    }

    fn load_page(&self, index: u32) -> crate::error::Result<PageData> {
        self.iter()
            .find(|p| p.index == index)
            .cloned()
            .ok_or_else(|| crate::error::FigureError::pdf_read(format!("page {index} not found")))
    }
}
