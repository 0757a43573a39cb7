pub mod geometry;
pub mod layout;
pub mod page;
pub mod record;
pub mod section;

pub use geometry::BBox;
pub use layout::{Band, ColumnBounds, PageLayout};
pub use page::{EmbeddedImage, PageData, PageSource, TextLine};
pub use record::{
    Association, BoilerplateBand, ImageId, ImageRecord, RawImage, RejectionReason,
    ValidationStatus,
};
pub use section::{Section, SectionRef};
