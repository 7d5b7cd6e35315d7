pub mod types;
pub mod error;
pub mod config;
pub mod data;
pub mod processing;
pub mod palette;
pub mod projection;
pub mod render;
pub mod pipeline;

pub use config::AppConfig;
pub use error::MapError;
pub use pipeline::{classify_table, run};
pub use render::RenderReport;
