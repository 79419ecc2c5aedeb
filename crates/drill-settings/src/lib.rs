//! # drill-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`DrillSettings::default()`]
//! 2. **User file**: `~/.crisisdrill/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `DRILL_*` overrides, highest priority
//!
//! Secrets never live in the settings file; see [`secrets`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod secrets;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{data_dir, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use secrets::Secrets;
pub use types::*;
