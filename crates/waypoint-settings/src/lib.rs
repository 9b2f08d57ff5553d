//! # waypoint-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`WaypointSettings::default()`]
//! 2. **User file**: `~/.waypoint/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WAYPOINT_*` and `LOCATIONIQ_API_KEY`

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
