// src/essayforge/mod.rs

pub mod client_wrapper;
pub mod clients;

pub mod budget;
pub mod citation;
pub mod config;
pub mod event;
pub mod orchestration;
pub mod output;
pub mod pipeline;
pub mod quality;
pub mod roles;
pub mod scoring;
pub mod selection;
pub mod synthesis;

// Export the driver at the module level so callers can write essayforge::EssayForge.
pub use config::EssayForgeConfig;
pub use pipeline::{EssayForge, RunReport};
