pub mod analysis;
pub mod config;
pub mod error;
pub mod filter;
pub mod images;
pub mod model;
pub mod naming;
pub mod pdf;
pub mod pipeline;
pub mod report;
