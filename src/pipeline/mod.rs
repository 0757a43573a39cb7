pub mod context;
pub mod document;
pub mod job_runner;
pub mod orchestrator;
pub mod page_processor;
