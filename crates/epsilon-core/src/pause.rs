//! Pause inference from the scenario clock.
//!
//! Headless servers do not report their game speed, but the scenario clock
//! stops advancing while paused. [`PauseInferencer`] watches successive
//! `(scenario_time, now)` samples and applies hysteresis so one slow poll
//! does not flip a paused game back to running.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Thresholds for [`PauseInferencer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseSettings {
    /// Samples closer together than this are not compared.
    pub min_sample_spacing: Duration,
    /// Scenario-clock advance (seconds) below which a sample counts as
    /// stalled.
    pub threshold_seconds: f64,
    /// Consecutive advancing samples needed to leave the paused state.
    pub resume_confirmations: u32,
}

impl Default for PauseSettings {
    fn default() -> Self {
        Self {
            min_sample_spacing: Duration::from_secs(1),
            threshold_seconds: 0.5,
            resume_confirmations: 2,
        }
    }
}

/// What the inferencer currently believes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    /// Fewer than two comparable samples since the last reset.
    #[default]
    Unknown,
    /// The clock is advancing.
    Running,
    /// The clock has stalled.
    Paused,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    scenario_time: f64,
    observed_at: Instant,
}

/// Sticky paused/running estimate with resume hysteresis.
#[derive(Debug, Clone)]
pub struct PauseInferencer {
    settings: PauseSettings,
    last: Option<Sample>,
    state: PauseState,
    running_streak: u32,
}

impl PauseInferencer {
    /// Create an inferencer in the unknown state.
    pub const fn new(settings: PauseSettings) -> Self {
        Self {
            settings,
            last: None,
            state: PauseState::Unknown,
            running_streak: 0,
        }
    }

    /// Current state.
    pub const fn state(&self) -> PauseState {
        self.state
    }

    /// Whether the current state is paused.
    pub fn is_paused(&self) -> bool {
        self.state == PauseState::Paused
    }

    /// Forget every sample.
    pub const fn reset(&mut self) {
        self.last = None;
        self.state = PauseState::Unknown;
        self.running_streak = 0;
    }

    /// Feed one sample and return whether the game is believed paused.
    ///
    /// A `None` scenario time means no scenario is loaded and resets the
    /// estimate. Samples arriving sooner than the minimum spacing after the
    /// recorded one are ignored without replacing it.
    pub fn observe(&mut self, scenario_time: Option<f64>, now: Instant) -> bool {
        let Some(scenario_time) = scenario_time.filter(|t| t.is_finite()) else {
            self.reset();
            return false;
        };
        let sample = Sample {
            scenario_time,
            observed_at: now,
        };

        let Some(last) = self.last else {
            self.last = Some(sample);
            return self.is_paused();
        };

        if now.saturating_duration_since(last.observed_at) < self.settings.min_sample_spacing {
            return self.is_paused();
        }

        let stalled = scenario_time - last.scenario_time < self.settings.threshold_seconds;
        if stalled {
            self.state = PauseState::Paused;
            self.running_streak = 0;
        } else if self.state == PauseState::Paused {
            self.running_streak = self.running_streak.saturating_add(1);
            if self.running_streak >= self.settings.resume_confirmations {
                self.state = PauseState::Running;
                self.running_streak = 0;
            }
        } else {
            self.state = PauseState::Running;
        }

        self.last = Some(sample);
        self.is_paused()
    }
}

impl Default for PauseInferencer {
    fn default() -> Self {
        Self::new(PauseSettings::default())
    }
}
