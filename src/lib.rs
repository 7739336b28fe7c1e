//! Content-generation pipeline orchestrator library: ties the component
//! crates together into a CLI (`cli::run`) and an HTTP service
//! (`readerforge_api::router`), sharing one configuration and runtime
//! bootstrap (`app::Runtime`).

pub mod app;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod logging;
pub mod receipts;
