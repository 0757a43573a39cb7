pub mod adaptive;
pub mod associator;
pub mod layout;
pub mod pattern;
pub mod section_detector;
