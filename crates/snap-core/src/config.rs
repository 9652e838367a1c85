//! Tunables for connection snapping, hysteresis and bumping.
//!
//! A `SnapConfig` is owned by each `Workspace`. Drag sessions copy it when
//! they start, so changing the config mid-drag only affects the next drag.

use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Search radius used when no candidate is currently previewed. Also the
    /// distance used by neighbour bumping. Default: **28**.
    pub snap_radius: f64,

    /// Search radius used once a candidate is previewed. Must not exceed
    /// `snap_radius`. Default: **28**.
    pub connecting_snap_radius: f64,

    /// How much closer a new candidate must be before it replaces the
    /// previewed one. Default: **8**.
    pub current_connection_preference: f64,

    /// Upper bound (exclusive) of the integer jitter added to bump offsets.
    /// Default: **10**.
    pub bump_randomness: u32,

    /// Pointer travel, in pixels, before a press turns into a drag.
    /// Default: **5**.
    pub drag_radius: f64,

    /// Poll interval of cosmetic effects, in milliseconds. Default: **10**.
    pub effect_tick_ms: u64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_radius: 28.0,
            connecting_snap_radius: 28.0,
            current_connection_preference: 8.0,
            bump_randomness: 10,
            drag_radius: 5.0,
            effect_tick_ms: 10,
        }
    }
}

impl SnapConfig {
    /// Parse a config from JSON. Missing keys fall back to the defaults.
    ///
    /// # Errors
    /// Returns the `serde_json` error if the text is not a valid config object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let config: SnapConfig = serde_json::from_str(text)?;
        Ok(config.normalized())
    }

    /// Clamp inconsistent values instead of rejecting them.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.connecting_snap_radius > self.snap_radius {
            log::warn!(
                "connecting_snap_radius {} exceeds snap_radius {}; clamping",
                self.connecting_snap_radius,
                self.snap_radius
            );
            self.connecting_snap_radius = self.snap_radius;
        }
        if self.current_connection_preference < 0.0 {
            self.current_connection_preference = 0.0;
        }
        self
    }
}
