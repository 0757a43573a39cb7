use std::cmp::Ordering;

use serde::Serialize;

use super::geometry::BBox;
use super::section::SectionRef;
use crate::error::ErrorKind;
use crate::filter::classify::ImageType;
use crate::images::hash::PerceptualHash;

/// Identity of an image: its page and its sequence number within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImageId {
    pub page: u32,
    pub sequence: u32,
}

/// A normalized embedded image, produced by the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub id: ImageId,
    pub bbox: BBox,
    pub data: Vec<u8>,
    /// Lower-cased file extension derived from the format hint.
    pub format: String,
    pub content_hash: String,
    pub perceptual_hash: Option<PerceptualHash>,
}

/// Outcome of associating an image with a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Association {
    pub confidence: f64,
    pub distance: f64,
    pub cross_column: bool,
    /// The best candidate lay further than `max_distance_pixels`.
    pub beyond_max_distance: bool,
}

impl Association {
    pub fn unassigned() -> Self {
        Self {
            confidence: 0.0,
            distance: f64::INFINITY,
            cross_column: false,
            beyond_max_distance: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoilerplateBand {
    Header,
    Footer,
}

/// Why an image was excluded from nomenclature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RejectionReason {
    Size { detail: String },
    Aspect { ratio: f64 },
    Boilerplate { band: BoilerplateBand },
    Duplicate { of: ImageId },
    NearDuplicate { of: ImageId, similarity: f64 },
    Logo { pages: u32, total_pages: u32 },
    Failed { kind: ErrorKind, message: String },
}

impl RejectionReason {
    pub fn failed(error: &crate::error::FigureError) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.detail(),
        }
    }

    /// Short label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Size { .. } => "size",
            Self::Aspect { .. } => "aspect",
            Self::Boilerplate { .. } => "boilerplate",
            Self::Duplicate { .. } => "duplicate",
            Self::NearDuplicate { .. } => "near_duplicate",
            Self::Logo { .. } => "logo",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValidationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected(RejectionReason),
}

/// An image moving through the pipeline.
///
/// Created unassigned, then associated, then validated or rejected. `image`
/// is `None` when extraction failed; such records are rejected from the start.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: ImageId,
    pub image: Option<RawImage>,
    /// Bounding box as reported by the parser, if any.
    pub bbox: Option<BBox>,
    pub section: SectionRef,
    pub association: Association,
    pub status: ValidationStatus,
    /// Shape-based guess at the image kind. Informational only.
    pub image_type: ImageType,
    pub filename: Option<String>,
}

impl ImageRecord {
    pub fn collected(image: RawImage) -> Self {
        Self {
            id: image.id,
            bbox: Some(image.bbox),
            image: Some(image),
            section: SectionRef::Unassigned,
            association: Association::unassigned(),
            status: ValidationStatus::Pending,
            image_type: ImageType::Unknown,
            filename: None,
        }
    }

    pub fn failed(id: ImageId, bbox: Option<BBox>, reason: RejectionReason) -> Self {
        Self {
            id,
            image: None,
            bbox,
            section: SectionRef::Unassigned,
            association: Association::unassigned(),
            status: ValidationStatus::Rejected(reason),
            image_type: ImageType::Unknown,
            filename: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ValidationStatus::Accepted
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        match &self.status {
            ValidationStatus::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.image.as_ref().map(|i| i.content_hash.as_str())
    }

    /// Deterministic page/position order: page, top, left, then sequence.
    /// Records without a bounding box sort after positioned ones on their page.
    pub fn position_cmp(&self, other: &Self) -> Ordering {
        let top = |r: &Self| r.bbox.map_or(f64::INFINITY, |b| b.y_min);
        let left = |r: &Self| r.bbox.map_or(f64::INFINITY, |b| b.x_min);
        self.id
            .page
            .cmp(&other.id.page)
            .then_with(|| top(self).total_cmp(&top(other)))
            .then_with(|| left(self).total_cmp(&left(other)))
            .then_with(|| self.id.sequence.cmp(&other.id.sequence))
    }
}
