pub mod collector;
pub mod hash;
