use std::fmt::Display;

use tokio::task_local;

task_local! {
    pub static FIXED_NOW: DateTime;
}

///Wall-clock time of the client, never the device's notion of time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::Local>,
}

impl DateTime {
    fn new<T: chrono::TimeZone>(delegate: chrono::DateTime<T>) -> Self {
        Self {
            delegate: delegate.with_timezone(&chrono::Local),
        }
    }

    pub fn now() -> Self {
        FIXED_NOW
            .try_with(|t| *t)
            .unwrap_or_else(|_| chrono::Local::now().into())
    }

    pub fn from_iso(iso8601: &str) -> anyhow::Result<Self> {
        Ok(chrono::DateTime::parse_from_rfc3339(iso8601)?.into())
    }

    pub fn to_iso_string(&self) -> String {
        self.delegate.to_rfc3339()
    }

    ///Relative to now, e.g. "3 seconds ago"
    pub fn to_human_readable(&self) -> String {
        let elapsed = self.delegate - Self::now().delegate;
        chrono_humanize::HumanTime::from(elapsed).to_string()
    }

    ///Short local format as shown next to a reading, e.g. "19/10 14:05"
    pub fn to_short_local(&self) -> String {
        self.delegate.format("%d/%m %H:%M").to_string()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        (Self::now().delegate - self.delegate).to_std().unwrap_or_default()
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate)
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        DateTime::new(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_now_can_be_fixed() {
        let fixed = DateTime::from_iso("2025-06-01T12:00:00Z").unwrap();

        let now = FIXED_NOW.scope(fixed, async { DateTime::now() }).await;

        assert_eq!(now, fixed);
    }

    #[tokio::test]
    async fn test_elapsed() {
        let reading_time = DateTime::from_iso("2025-06-01T12:00:00Z").unwrap();
        let now = DateTime::from_iso("2025-06-01T12:00:09Z").unwrap();

        let elapsed = FIXED_NOW.scope(now, async { reading_time.elapsed() }).await;

        assert_eq!(elapsed, std::time::Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_elapsed_of_future_time_is_zero() {
        let reading_time = DateTime::from_iso("2025-06-01T12:00:10Z").unwrap();
        let now = DateTime::from_iso("2025-06-01T12:00:00Z").unwrap();

        let elapsed = FIXED_NOW.scope(now, async { reading_time.elapsed() }).await;

        assert_eq!(elapsed, std::time::Duration::ZERO);
    }

    #[test]
    fn test_iso_roundtrip_keeps_instant() {
        let dt = DateTime::from_iso("2025-06-01T12:00:00Z").unwrap();
        assert_eq!(DateTime::from_iso(&dt.to_iso_string()).unwrap(), dt);
    }
}
