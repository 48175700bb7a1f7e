//! Runtime configuration (spec.md §6, Design Notes "Global mutable state").
//! A plain value struct passed into `Match::spawn` at construction rather
//! than a module-level singleton; `Default` gives the spec's defaults, and
//! `from_env` lets a deployment override them without a global.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub match_time_seconds: u64,
    pub timer_speed_ms: u64,
    pub enemies_speed_ms: u64,
    pub match_time_out_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            match_time_seconds: 300,
            timer_speed_ms: 1000,
            enemies_speed_ms: 800,
            match_time_out_seconds: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            match_time_seconds: env_u64("MATCH_TIME_SECONDS").unwrap_or(defaults.match_time_seconds),
            timer_speed_ms: env_u64("TIMER_SPEED_MS").unwrap_or(defaults.timer_speed_ms),
            enemies_speed_ms: env_u64("ENEMIES_SPEED_MS").unwrap_or(defaults.enemies_speed_ms),
            match_time_out_seconds: env_u64("MATCH_TIME_OUT_SECONDS").unwrap_or(defaults.match_time_out_seconds),
        }
    }

    pub fn timer_speed(&self) -> Duration {
        Duration::from_millis(self.timer_speed_ms)
    }

    pub fn match_time_out(&self) -> Duration {
        Duration::from_secs(self.match_time_out_seconds)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
