// Time-to-arrival and arrival ordering
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::cmp::Ordering;

use crate::nta_locale::Locale;
use crate::nta_models::{Lang, TrainRecord};

pub struct Countdown;

impl Countdown {
    /// Deltas in `[NOW_AFTER_SECS, NOW_BEFORE_SECS]` render as the "now" token.
    pub const NOW_AFTER_SECS: i64 = -20;
    pub const NOW_BEFORE_SECS: i64 = 1;

    /// Pins a feed-local wall-clock time to an instant.
    pub fn eta_instant(eta: NaiveDateTime, feed_tz: Tz) -> DateTime<Utc> {
        feed_tz
            .from_local_datetime(&eta)
            .earliest()
            // Local times skipped by a DST jump do not exist; read them as UTC wall time
            .unwrap_or_else(|| feed_tz.from_utc_datetime(&eta))
            .with_timezone(&Utc)
    }

    /// Signed seconds until arrival, floored to whole seconds; negative once
    /// the train is past due. A true delta shows "now" while it is in
    /// `[-20 s, +2 s)`.
    pub fn seconds_until(eta: NaiveDateTime, now: DateTime<Utc>, feed_tz: Tz) -> i64 {
        (Self::eta_instant(eta, feed_tz) - now)
            .num_milliseconds()
            .div_euclid(1000)
    }

    pub fn is_now(delta_secs: i64) -> bool {
        (Self::NOW_AFTER_SECS..=Self::NOW_BEFORE_SECS).contains(&delta_secs)
    }

    /// Countdown text for a signed delta in `lang`.
    pub fn format(delta_secs: i64, lang: Lang) -> String {
        let locale = Locale::of(lang);

        if Self::is_now(delta_secs) {
            return locale.now.to_string();
        }

        let magnitude = delta_secs.unsigned_abs();
        let minutes = magnitude / 60;
        let seconds = magnitude % 60;

        let body = if minutes > 0 {
            format!(
                "{}{}{:02}{}",
                minutes, locale.minute_unit, seconds, locale.second_unit
            )
        } else {
            format!("{}{}", seconds, locale.second_unit)
        };

        if delta_secs > 0 {
            locale.future(&body)
        } else {
            locale.past(&body)
        }
    }

    /// Ascending by eta; equal etas fall back to the train id so the order is total.
    pub fn compare(a: &TrainRecord, b: &TrainRecord) -> Ordering {
        a.eta.cmp(&b.eta).then_with(|| a.train.cmp(&b.train))
    }
}
