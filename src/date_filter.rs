// src/date_filter.rs
//! Recency filter. Articles parsed-older than `now - days_back` are dropped;
//! undated or unparseable dates fail open and pass through. The fail-open
//! default is a config flag, not hard-coded.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::config::FilterConfig;
use crate::error::ScrapeError;

/// Parse an ISO-8601-ish timestamp as found in `datetime` attributes and
/// `article:published_time` meta tags. Returns `None` on anything malformed.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Tolerate a bare trailing Z or missing offset.
    let s = s.strip_suffix('Z').unwrap_or(s);
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    debug!(error = %ScrapeError::DateParse(s.to_string()), "treating article as undated");
    None
}

#[derive(Debug, Clone)]
pub struct DateFilter {
    include_undated: bool,
}

impl DateFilter {
    pub fn new(cfg: &FilterConfig) -> Self {
        Self {
            include_undated: cfg.include_undated,
        }
    }

    /// True when the article survives the cutoff window.
    pub fn passes(
        &self,
        published_at: Option<DateTime<Utc>>,
        days_back: i64,
        now: DateTime<Utc>,
    ) -> bool {
        match published_at {
            Some(ts) => {
                let cutoff = now - chrono::Duration::days(days_back);
                ts >= cutoff
            }
            None => self.include_undated,
        }
    }
}

impl Default for DateFilter {
    fn default() -> Self {
        Self {
            include_undated: true,
        }
    }
}
