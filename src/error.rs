use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FigureError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("Section detection error: {0}")]
    SectionDetectionError(String),

    #[error("Image extraction error: {0}")]
    ImageExtractionError(String),

    #[error("Association error: {0}")]
    AssociationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// 失敗の分類タグ。棄却レコードやページ警告に記録される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    PdfRead,
    SectionDetection,
    ImageExtraction,
    Association,
    Validation,
    Report,
    Io,
}

impl FigureError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Configuration,
            Self::PdfReadError(_) => ErrorKind::PdfRead,
            Self::SectionDetectionError(_) => ErrorKind::SectionDetection,
            Self::ImageExtractionError(_) => ErrorKind::ImageExtraction,
            Self::AssociationError(_) => ErrorKind::Association,
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::ReportError(_) => ErrorKind::Report,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Returns the message without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::ConfigError(m)
            | Self::PdfReadError(m)
            | Self::SectionDetectionError(m)
            | Self::ImageExtractionError(m)
            | Self::AssociationError(m)
            | Self::ValidationError(m)
            | Self::ReportError(m) => m.clone(),
            Self::IoError(e) => e.to_string(),
        }
    }
}

/// Generates factory methods for [`FigureError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl FigureError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a section detection error.
    section_detection => SectionDetectionError,
    /// Create an image extraction error.
    image_extraction => ImageExtractionError,
    /// Create an association error.
    association => AssociationError,
    /// Create a validation error.
    validation => ValidationError,
    /// Create a report error.
    report => ReportError,
}

impl From<lopdf::Error> for FigureError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_json::Error> for FigureError {
    fn from(e: serde_json::Error) -> Self {
        Self::ReportError(e.to_string())
    }
}

impl From<serde_yml::Error> for FigureError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<regex::Error> for FigureError {
    fn from(e: regex::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<image::ImageError> for FigureError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageExtractionError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FigureError>;
