use chrono::{DateTime, Utc};

use super::domain::{CallListEntry, CallbackBucket};

/// Source of wall-clock time for the queue.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Classifies callbacks against a single instant captured once per request, so every
/// entry in one response is bucketed against the same `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackClock {
    now: DateTime<Utc>,
}

impl CallbackClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn capture(clock: &dyn Clock) -> Self {
        Self::at(clock.now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn bucket_for(&self, callback_at: Option<DateTime<Utc>>) -> CallbackBucket {
        match callback_at {
            None => CallbackBucket::Immediate,
            Some(at) if at > self.now => CallbackBucket::Scheduled,
            Some(_) => CallbackBucket::Due,
        }
    }

    pub fn classify(&self, entry: &CallListEntry) -> CallbackBucket {
        self.bucket_for(entry.callback_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).single().expect("valid")
    }

    #[test]
    fn buckets_relative_to_captured_instant() {
        let clock = CallbackClock::at(instant());

        assert_eq!(clock.bucket_for(None), CallbackBucket::Immediate);
        assert_eq!(
            clock.bucket_for(Some(instant() - Duration::seconds(1))),
            CallbackBucket::Due
        );
        assert_eq!(
            clock.bucket_for(Some(instant() + Duration::seconds(1))),
            CallbackBucket::Scheduled
        );
    }

    #[test]
    fn callback_exactly_now_is_due() {
        let clock = CallbackClock::at(instant());
        assert_eq!(clock.bucket_for(Some(instant())), CallbackBucket::Due);
    }
}
