// src/config/mod.rs

//! Configuration loading and validation for procguard.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate guard definitions (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, GuardSection, InstallSection, RawConfigFile, StartupSection};
