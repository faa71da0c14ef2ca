//! # fleet-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`FleetSettings::default()`]
//! 2. **User file** — `~/.fleet/settings.json` or an explicit path (deep-merged over defaults)
//! 3. **Environment variables** — `FLEET_*` overrides (highest priority)
//!
//! Providers are configured as command templates:
//!
//! ```json
//! {
//!   "registry": { "maxCompleted": 200 },
//!   "providers": {
//!     "claude": {
//!       "command": "claude",
//!       "args": ["-p", "--model", "{model}"],
//!       "defaultModel": "sonnet",
//!       "aliases": { "sonnet": "claude-sonnet-4-5" },
//!       "timeoutSecs": 600
//!     }
//!   }
//! }
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path,
    load_settings_with_report, settings_path, LoadedSettings, RejectedOverride,
};
pub use types::*;
