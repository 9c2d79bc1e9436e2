//! Configuration for the grid viewer.
//!
//! Provides [`ViewerConfig`], loaded from a TOML file or from the environment.
//!
//! # Usage
//!
//! ```rust
//! use gv_config::ViewerConfig;
//!
//! let config = ViewerConfig::from_toml(
//!     r#"
//!     [storage]
//!     root = "comfyui_api_outputs"
//!     "#,
//! )
//! .unwrap();
//! let store = config.storage.open();
//! assert_eq!(store.root().to_str(), Some("comfyui_api_outputs"));
//! ```

pub mod error;
pub mod prelude;
pub mod viewer_config;

pub use viewer_config::{ServerConfig, StorageConfig, ViewerConfig};
