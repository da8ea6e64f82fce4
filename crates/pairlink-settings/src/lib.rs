//! # pairlink-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`PairlinkSettings::default()`]
//! 2. **User file** — `~/.pairlink/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `PAIRLINK_*` overrides (highest priority)
//!
//! The loaded value is handed to the server at startup; there is no global
//! settings cache.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
    LoadedSettings, RejectedOverride,
};
pub use types::*;
