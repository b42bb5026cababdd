//! Tunable heuristics for every accumulator.
//!
//! All sections default to the values the metrics were calibrated with, so an
//! empty TOML file (or no file at all) reproduces the stock behaviour.

use crate::error::{PaceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub diff_delta: DiffDeltaWeights,
    pub sessions: SessionConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Trimmed lines this long or shorter are never meaningful.
    pub min_line_length: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { min_line_length: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffDeltaWeights {
    pub add_weight: f64,
    pub update_weight: f64,
    pub delete_weight: f64,
    pub move_weight: f64,
    /// Share of a symmetric add/delete pair counted as a real modification.
    pub update_factor: f64,
}

impl Default for DiffDeltaWeights {
    fn default() -> Self {
        Self {
            add_weight: 1.0,
            update_weight: 0.75,
            delete_weight: 0.25,
            move_weight: 0.1,
            update_factor: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_gap_minutes: i64,
    pub lead_minutes: i64,
    pub trail_minutes: i64,
    pub min_session_minutes: i64,
    pub max_session_hours: f64,
    pub single_commit_factor: f64,
    pub busy_session_commits: usize,
    pub busy_session_factor: f64,
    /// Floor applied to the duration when computing the change rate.
    pub min_rate_hours: f64,
    pub high_rate_threshold: f64,
    pub high_rate_factor: f64,
    pub low_rate_threshold: f64,
    pub low_rate_factor: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_gap_minutes: 120,
            lead_minutes: 30,
            trail_minutes: 15,
            min_session_minutes: 30,
            max_session_hours: 8.0,
            single_commit_factor: 0.75,
            busy_session_commits: 10,
            busy_session_factor: 0.9,
            min_rate_hours: 0.1,
            high_rate_threshold: 1000.0,
            high_rate_factor: 0.8,
            low_rate_threshold: 50.0,
            low_rate_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub session_gap_hours: f64,
    pub short_break_hours: f64,
    pub long_break_hours: f64,
    /// How many of the most recent work sessions each profile keeps.
    pub recent_sessions: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            session_gap_hours: 4.0,
            short_break_hours: 4.0,
            long_break_hours: 24.0,
            recent_sessions: 5,
        }
    }
}

/// Upper bound for session window settings: one week.
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.diff_delta;
        for (name, value) in [
            ("diff_delta.add_weight", d.add_weight),
            ("diff_delta.update_weight", d.update_weight),
            ("diff_delta.delete_weight", d.delete_weight),
            ("diff_delta.move_weight", d.move_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PaceError::Config(format!("{name} must be finite and not negative")));
            }
        }
        if !(0.0..=1.0).contains(&d.update_factor) {
            return Err(PaceError::Config(
                "diff_delta.update_factor must lie in [0, 1]".to_string(),
            ));
        }

        let s = &self.sessions;
        if s.max_gap_minutes <= 0 {
            return Err(PaceError::Config("sessions.max_gap_minutes must be positive".to_string()));
        }
        if s.lead_minutes < 0 || s.trail_minutes < 0 || s.min_session_minutes < 0 {
            return Err(PaceError::Config(
                "session padding and minimum must not be negative".to_string(),
            ));
        }
        for (name, value) in [
            ("sessions.max_gap_minutes", s.max_gap_minutes),
            ("sessions.lead_minutes", s.lead_minutes),
            ("sessions.trail_minutes", s.trail_minutes),
            ("sessions.min_session_minutes", s.min_session_minutes),
        ] {
            if value > MAX_WINDOW_MINUTES {
                return Err(PaceError::Config(format!(
                    "{name} must not exceed {MAX_WINDOW_MINUTES} minutes"
                )));
            }
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(s.max_session_hours) || !positive(s.min_rate_hours) {
            return Err(PaceError::Config(
                "sessions.max_session_hours and sessions.min_rate_hours must be positive".to_string(),
            ));
        }

        let t = &self.timing;
        if !positive(t.session_gap_hours) {
            return Err(PaceError::Config("timing.session_gap_hours must be positive".to_string()));
        }
        if !t.short_break_hours.is_finite() || !t.long_break_hours.is_finite() {
            return Err(PaceError::Config("timing break thresholds must be finite".to_string()));
        }
        if t.short_break_hours > t.long_break_hours {
            return Err(PaceError::Config(
                "timing.short_break_hours must not exceed timing.long_break_hours".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
[sessions]
max_gap_minutes = 90
"#,
        )
        .unwrap();
        assert_eq!(config.sessions.max_gap_minutes, 90);
        assert_eq!(config.sessions.lead_minutes, 30);
        assert_eq!(config.diff_delta, DiffDeltaWeights::default());
    }

    #[test]
    fn rejects_out_of_range_update_factor() {
        let err = EngineConfig::from_toml_str("[diff_delta]\nupdate_factor = 1.5\n").unwrap_err();
        assert!(matches!(err, PaceError::Config(_)));
    }

    #[test]
    fn rejects_session_windows_longer_than_a_week() {
        for key in ["max_gap_minutes", "lead_minutes", "trail_minutes", "min_session_minutes"] {
            let toml = format!("[sessions]\n{key} = 9223372036854775807\n");
            let err = EngineConfig::from_toml_str(&toml).unwrap_err();
            assert!(matches!(err, PaceError::Config(_)), "{key} accepted");
        }
        let at_cap = format!("[sessions]\nmax_gap_minutes = {MAX_WINDOW_MINUTES}\n");
        assert!(EngineConfig::from_toml_str(&at_cap).is_ok());
    }

    #[test]
    fn rejects_nan_session_cap() {
        let err = EngineConfig::from_toml_str("[sessions]\nmax_session_hours = nan\n").unwrap_err();
        assert!(matches!(err, PaceError::Config(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EngineConfig::from_toml_str("[sessions\n").unwrap_err();
        assert!(matches!(err, PaceError::Config(_)));
    }
}
