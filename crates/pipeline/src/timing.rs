//! Posting-time advice.
//!
//! Each platform carries a [`TimingProfile`]: the weekdays and UTC hours its
//! audience is most active, free-form days to avoid, and a note. From a
//! profile and the current time this module answers two questions:
//!
//! - [`suggest`]: is now a good time, and when does the next window open?
//! - [`check_schedule`]: notices to show before posting right now.
//!
//! Everything is computed from the caller's [`Timestamp`]; nothing here reads
//! the clock.

use chrono::{DateTime, Datelike, Days, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{PlatformId, Timestamp};

pub use chrono::Weekday;

/// Hours (UTC) before which posting is flagged rather than merely off-peak.
const EARLY_HOUR_UTC: u32 = 6;

/// When a platform's audience is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingProfile {
    pub best_days: Vec<Weekday>,
    /// Hours of the day, 0-23, in ascending order.
    pub best_hours_utc: Vec<u32>,
    /// Human-readable days or periods to avoid, e.g. `"Weekends"` or `"Friday"`.
    pub avoid: Vec<String>,
    pub notes: String,
}

impl TimingProfile {
    pub fn new(best_days: &[Weekday], best_hours_utc: &[u32], avoid: &[&str], notes: &str) -> Self {
        let mut hours: Vec<u32> = best_hours_utc.iter().copied().filter(|h| *h < 24).collect();
        hours.sort_unstable();
        hours.dedup();
        Self {
            best_days: best_days.to_vec(),
            best_hours_utc: hours,
            avoid: avoid.iter().map(|s| s.to_string()).collect(),
            notes: notes.to_string(),
        }
    }

    /// `true` when `now` falls on a best day and inside a best hour.
    pub fn is_good_time(&self, now: Timestamp) -> bool {
        let at = now.as_datetime();
        self.best_days.contains(&at.weekday()) && self.best_hours_utc.contains(&at.hour())
    }

    /// Start of the next best hour strictly after the current hour.
    ///
    /// Later today when today is a best day and a best hour remains, otherwise
    /// the earliest best hour on the next best day (up to a week ahead).
    /// `None` when the profile names no days or no hours.
    pub fn next_window(&self, now: Timestamp) -> Option<Timestamp> {
        let first_hour = *self.best_hours_utc.first()?;
        let at = now.as_datetime();

        if self.best_days.contains(&at.weekday()) {
            if let Some(hour) = self.best_hours_utc.iter().find(|h| **h > at.hour()) {
                return on_day_at(at, 0, *hour);
            }
        }
        (1..=7)
            .find(|offset| {
                at.checked_add_days(Days::new(*offset))
                    .is_some_and(|day| self.best_days.contains(&day.weekday()))
            })
            .and_then(|offset| on_day_at(at, offset, first_hour))
    }

    /// Whether `day` is listed as a day to avoid, by name or as a weekend.
    pub fn avoids(&self, day: Weekday) -> bool {
        let weekend = matches!(day, Weekday::Sat | Weekday::Sun);
        self.avoid.iter().any(|entry| {
            let entry = entry.trim().to_ascii_lowercase();
            entry == day_name(day).to_ascii_lowercase() || (weekend && entry.starts_with("weekend"))
        })
    }
}

impl Default for TimingProfile {
    /// Used for platforms without specific data.
    fn default() -> Self {
        Self::new(
            &[Weekday::Tue, Weekday::Wed, Weekday::Thu],
            &[14, 15],
            &["Weekends"],
            "No specific data. Weekday mornings US time are generally safe.",
        )
    }
}

/// Timing advice for one platform at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSuggestion {
    pub platform: PlatformId,
    #[serde(flatten)]
    pub profile: TimingProfile,
    pub current_is_good: bool,
    pub next_window: Option<Timestamp>,
}

pub fn suggest(platform: &PlatformId, profile: &TimingProfile, now: Timestamp) -> TimingSuggestion {
    TimingSuggestion {
        platform: platform.clone(),
        profile: profile.clone(),
        current_is_good: profile.is_good_time(now),
        next_window: profile.next_window(now),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A remark about posting to a platform right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleNotice {
    pub platform: PlatformId,
    pub level: NoticeLevel,
    pub message: String,
    pub suggestion: String,
}

/// Notices for posting to `platform` at `now`.
///
/// A good time yields a single info notice. Otherwise an avoided day and a
/// very early hour (before 06:00 UTC) are warnings; any other off-peak hour
/// is informational.
pub fn check_schedule(platform: &PlatformId, profile: &TimingProfile, now: Timestamp) -> Vec<ScheduleNotice> {
    let notice = |level, message: String, suggestion: String| ScheduleNotice {
        platform: platform.clone(),
        level,
        message,
        suggestion,
    };

    if profile.is_good_time(now) {
        return vec![notice(
            NoticeLevel::Info,
            format!("Good time to post on {platform}"),
            "Post now".to_string(),
        )];
    }

    let at = now.as_datetime();
    let next = profile
        .next_window(now)
        .map_or_else(|| "any time".to_string(), describe_window);
    let mut notices = Vec::new();

    if profile.avoids(at.weekday()) {
        notices.push(notice(
            NoticeLevel::Warning,
            format!(
                "{} posting to {platform} typically gets lower engagement",
                day_name(at.weekday())
            ),
            format!("Consider waiting until {next}"),
        ));
    }

    let hour = at.hour();
    if hour < EARLY_HOUR_UTC {
        notices.push(notice(
            NoticeLevel::Warning,
            format!("Suboptimal time for {platform} (current: {hour:02}:00 UTC)"),
            format!("Next optimal time: {next}"),
        ));
    } else {
        notices.push(notice(
            NoticeLevel::Info,
            format!("Non-peak time for {platform} (current: {hour:02}:00 UTC)"),
            format!("For better engagement, try: {next}"),
        ));
    }
    notices
}

/// `true` when any notice deserves the user's attention before posting.
pub fn should_warn(notices: &[ScheduleNotice]) -> bool {
    notices.iter().any(|n| n.level == NoticeLevel::Warning)
}

/// Renders a window start as e.g. `"Wednesday 14:00 UTC"`.
pub fn describe_window(at: Timestamp) -> String {
    at.as_datetime().format("%A %H:%M UTC").to_string()
}

fn on_day_at(at: DateTime<Utc>, offset_days: u64, hour: u32) -> Option<Timestamp> {
    at.date_naive()
        .checked_add_days(Days::new(offset_days))?
        .and_hms_opt(hour, 0, 0)
        .map(|naive| Timestamp::from_utc(naive.and_utc()))
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
