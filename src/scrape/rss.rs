// src/scrape/rss.rs
//! RSS feed parsing for kind = "rss" sources. Feed items become candidate
//! (anchor text, href) pairs for the link matcher, so the downstream path is
//! identical to HTML listing pages.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::date_filter::parse_published;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
}

fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        let unix = dt.to_offset(UtcOffset::UTC).unix_timestamp();
        return Utc.timestamp_opt(unix, 0).single();
    }
    // Obsolete zone names ("GMT", "EST") that the strict parser rejects.
    if let Ok(dt) = DateTime::parse_from_rfc2822(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some feeds publish ISO-8601 instead of RFC 2822.
    parse_published(ts)
}

/// Parse one RSS document into feed items. Items without a link are useless
/// downstream and are dropped here.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss feed xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let Some(link) = it.link.filter(|l| !l.trim().is_empty()) else {
            continue;
        };
        out.push(FeedItem {
            title: it.title.unwrap_or_default().trim().to_string(),
            link: link.trim().to_string(),
            published_at: it.pub_date.as_deref().and_then(parse_pub_date),
            summary: it.description.unwrap_or_default().trim().to_string(),
        });
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Business Feed</title>
    <item>
      <title>Apple expands renewable energy program</title>
      <link>https://feeds.example.com/apple-renewables</link>
      <pubDate>Tue, 06 May 2025 09:00:00 GMT</pubDate>
      <description>Solar &ndash; and wind &ndash; deals signed.</description>
    </item>
    <item>
      <title>No link here</title>
      <pubDate>Tue, 06 May 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated governance story</title>
      <link>https://feeds.example.com/governance</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_drops_linkless() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].link,
            "https://feeds.example.com/apple-renewables"
        );
        assert!(items[0].published_at.is_some());
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn rfc2822_and_iso_dates_both_parse() {
        assert!(parse_pub_date("Tue, 06 May 2025 09:00:00 GMT").is_some());
        assert!(parse_pub_date("2025-05-06T09:00:00Z").is_some());
        assert!(parse_pub_date("sometime in May").is_none());
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(parse_feed("<rss><channel><item>").is_err());
    }
}
