//! Infrastructure layer - filesystem, network and configuration.
//!
//! This layer owns every side effect: capture reading, export writing,
//! remote delivery and the config file.

pub mod assets;
pub mod capture;
pub mod config;
pub mod download;
pub mod notion;

pub use assets::ImageInliner;
pub use capture::{load_capture_file, CaptureSource};
pub use config::{
    config_file_path, ensure_config_exists, load_config, load_config_from_file, AppConfig,
};
pub use download::write_export;
pub use notion::{normalize_notion_page_id, NotionClient};
