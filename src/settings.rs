// ============================================================================
// BLUR SETTINGS — tunables a host persists alongside its own settings
// ============================================================================

use serde::{Deserialize, Serialize};

/// Per-region blur tunables.
///
/// Stored as `key=value` lines so a host can append them to its existing
/// config file, or via serde for hosts that keep structured settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurSettings {
    /// Sampling-offset multiplier.  Larger values widen the blur; this is not
    /// an opacity.
    pub blur_strength: f32,
    /// Corner radius of the composited image, in points.
    pub corner_radius: f32,
    /// Seconds the region must stay active before capture+blur runs.
    pub settle_delay: f64,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            blur_strength: 0.95,
            corner_radius: 6.0,
            settle_delay: 0.15,
        }
    }
}

impl BlurSettings {
    /// Serialize to config lines (no trailing newline per line).
    pub fn to_config_lines(&self) -> Vec<String> {
        vec![
            format!("blur_strength={}", self.blur_strength),
            format!("blur_corner_radius={}", self.corner_radius),
            format!("blur_settle_delay={}", self.settle_delay),
        ]
    }

    /// Apply one `key=value` line.  Returns `false` for keys this struct does
    /// not own so the caller can route them elsewhere.  Unparseable values
    /// keep the current value.
    pub fn apply_config_line(&mut self, line: &str) -> bool {
        let Some((key, val)) = line.split_once('=') else { return false };
        let val = val.trim();
        match key.trim() {
            "blur_strength" => {
                self.blur_strength = val.parse::<f32>().map(|v| v.max(0.0)).unwrap_or(self.blur_strength);
            }
            "blur_corner_radius" => {
                self.corner_radius = val.parse::<f32>().map(|v| v.max(0.0)).unwrap_or(self.corner_radius);
            }
            "blur_settle_delay" => {
                self.settle_delay = val.parse::<f64>().map(|v| v.max(0.0)).unwrap_or(self.settle_delay);
            }
            _ => return false,
        }
        true
    }

    /// Parse a whole config file, ignoring unknown keys (returns defaults for
    /// anything missing).
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            s.apply_config_line(line);
        }
        s
    }
}
