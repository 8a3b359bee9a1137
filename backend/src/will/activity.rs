use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

pub const MINUTE: u64 = 60;
pub const HOUR: u64 = 60 * MINUTE;
pub const DAY: u64 = 24 * HOUR;
pub const YEAR: u64 = 365 * DAY;

/// Time left before distribution becomes permissible. Never negative, and a
/// clock that reads earlier than the last check-in cannot extend it past the
/// full period.
pub fn time_remaining(now: Timestamp, inactivity_period: u64, last_check_in: Timestamp) -> u64 {
    let elapsed = now.saturating_sub(last_check_in);
    inactivity_period.saturating_sub(elapsed)
}

pub fn is_expired(now: Timestamp, inactivity_period: u64, last_check_in: Timestamp) -> bool {
    time_remaining(now, inactivity_period, last_check_in) == 0
}

/// Share of the inactivity period already used up, in `[0, 1]`.
pub fn elapsed_fraction(now: Timestamp, inactivity_period: u64, last_check_in: Timestamp) -> f64 {
    if inactivity_period == 0 {
        return 1.0;
    }
    let remaining = time_remaining(now, inactivity_period, last_check_in);
    (1.0 - remaining as f64 / inactivity_period as f64).clamp(0.0, 1.0)
}

/// Last proof-of-life event of a will.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityTracker {
    last_check_in: Timestamp,
}

impl ActivityTracker {
    pub fn new(now: Timestamp) -> Self {
        Self { last_check_in: now }
    }

    /// Moves the last check-in forward to `now`. Returns `false` and keeps the
    /// previous value when `now` is earlier.
    pub fn record_activity(&mut self, now: Timestamp) -> bool {
        if now < self.last_check_in {
            return false;
        }
        self.last_check_in = now;
        true
    }

    pub fn last_check_in(&self) -> Timestamp {
        self.last_check_in
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLeft {
    pub years: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl TimeLeft {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            years: secs / YEAR,
            days: secs % YEAR / DAY,
            hours: secs % DAY / HOUR,
            minutes: secs % HOUR / MINUTE,
        }
    }
}

/// Countdown view of a will, derived from its period and last check-in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityReport {
    pub last_check_in: Timestamp,
    pub inactivity_period: u64,
    pub deadline: Timestamp,
    pub remaining: u64,
    pub elapsed_fraction: f64,
    pub expired: bool,
    pub time_left: TimeLeft,
}

impl ActivityReport {
    pub fn at(now: Timestamp, inactivity_period: u64, last_check_in: Timestamp) -> Self {
        let remaining = time_remaining(now, inactivity_period, last_check_in);
        Self {
            last_check_in,
            inactivity_period,
            deadline: last_check_in.saturating_add(inactivity_period),
            remaining,
            elapsed_fraction: elapsed_fraction(now, inactivity_period, last_check_in),
            expired: remaining == 0,
            time_left: TimeLeft::from_secs(remaining),
        }
    }
}
