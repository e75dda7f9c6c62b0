pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod ids;
pub mod planner;
pub mod selection;
pub mod store;
pub mod utils;
pub mod weighting;

pub use config::Config;
pub use error::{LibraryError, Result};
pub use planner::{GenerationPlan, GenerationReport, GenerationSettings};
pub use store::{InfluenceStore, PromptStore};
