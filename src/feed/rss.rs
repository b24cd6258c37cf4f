// src/feed/rss.rs
//! RSS 2.0 document codec for the persisted feed.

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;
use std::io::Write;

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::model::FeedItem;

pub const GENERATOR: &str = "gh-trends";

// Read side only; fields the merge does not need are ignored.
#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(rename = "lastBuildDate", default)]
    last_build_date: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    guid: Option<Guid>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Items recovered from a document plus how many entries were unusable.
#[derive(Debug, Default)]
pub struct Decoded {
    pub items: Vec<FeedItem>,
    pub dropped: usize,
}

/// Parse a persisted feed. Structurally broken XML is an error; individual
/// entries lacking title/link/guid or a readable `pubDate` are skipped.
pub fn decode(xml: &str) -> Result<Decoded> {
    let rss: Rss = from_str(xml).map_err(|e| Error::Validation(format!("rss: {e}")))?;

    let mut out = Decoded::default();
    for it in rss.channel.item {
        match into_feed_item(it) {
            Some(item) => out.items.push(item),
            None => out.dropped += 1,
        }
    }
    Ok(out)
}

fn into_feed_item(it: Item) -> Option<FeedItem> {
    let published_at = DateTime::parse_from_rfc2822(it.pub_date.as_deref()?.trim())
        .ok()?
        .with_timezone(&Utc);
    let item = FeedItem {
        title: it.title?,
        link: it.link?,
        description: it.description.unwrap_or_default(),
        published_at,
        guid: it.guid?.value.trim().to_string(),
    };
    item.validate().ok()?;
    Some(item)
}

/// Render the whole feed, items in the given order, stamped with `generated_at`.
pub fn encode(cfg: &FeedConfig, items: &[FeedItem], generated_at: DateTime<Utc>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_document(&mut writer, cfg, items, generated_at)
        .map_err(|e| Error::FeedEncode(e.to_string()))?;

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::FeedEncode(e.to_string()))?;
    xml.push('\n');
    Ok(xml)
}

fn write_document<W: Write>(
    w: &mut Writer<W>,
    cfg: &FeedConfig,
    items: &[FeedItem],
    generated_at: DateTime<Utc>,
) -> quick_xml::Result<()> {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.create_element("rss")
        .with_attribute(("version", "2.0"))
        .write_inner_content(|w| {
            w.create_element("channel").write_inner_content(|w| {
                text_element(w, "title", &cfg.title)?;
                text_element(w, "link", &cfg.link)?;
                text_element(w, "description", &cfg.description)?;
                text_element(w, "language", "en-us")?;
                text_element(w, "lastBuildDate", &generated_at.to_rfc2822())?;
                text_element(w, "generator", GENERATOR)?;
                for it in items {
                    w.create_element("item").write_inner_content(|w| write_item(w, it))?;
                }
                Ok::<_, quick_xml::Error>(())
            })?;
            Ok::<_, quick_xml::Error>(())
        })?;
    Ok(())
}

fn write_item<W: Write>(w: &mut Writer<W>, it: &FeedItem) -> quick_xml::Result<()> {
    text_element(w, "title", &it.title)?;
    text_element(w, "link", &it.link)?;
    text_element(w, "description", &it.description)?;
    text_element(w, "pubDate", &it.published_at.to_rfc2822())?;
    // Text stays on the tag line; readers compare guids verbatim.
    w.create_element("guid")
        .with_attribute(("isPermaLink", "false"))
        .write_text_content(BytesText::new(&it.guid))?;
    Ok(())
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()> {
    w.create_element(name).write_text_content(BytesText::new(text))?;
    Ok(())
}

/// `lastBuildDate` of a persisted document, if readable.
pub fn generated_at(xml: &str) -> Option<DateTime<Utc>> {
    let rss: Rss = from_str(xml).ok()?;
    let raw = rss.channel.last_build_date?;
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(guid: &str, ts: DateTime<Utc>) -> FeedItem {
        FeedItem {
            title: guid.to_string(),
            link: format!("https://github.com/{guid}"),
            description: "a <tiny> & fast tool".to_string(),
            published_at: ts,
            guid: guid.to_string(),
        }
    }

    #[test]
    fn encoded_document_reads_back() {
        let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let items = vec![item("acme/a", ts), item("acme/b", ts - chrono::Duration::days(1))];
        let xml = encode(&FeedConfig::default(), &items, ts).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\">"));
        assert!(xml.contains("<guid isPermaLink=\"false\">acme/a</guid>"));
        assert!(xml.contains("&lt;tiny&gt; &amp; fast"));

        let decoded = decode(&xml).unwrap();
        assert_eq!(decoded.dropped, 0);
        assert_eq!(decoded.items, items);
        assert_eq!(generated_at(&xml), Some(ts));
    }

    #[test]
    fn guid_text_is_written_inline() {
        let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let xml = encode(&FeedConfig::default(), &[item("acme/a", ts)], ts).unwrap();

        let line = xml
            .lines()
            .find(|l| l.contains("<guid"))
            .expect("guid line");
        assert_eq!(line.trim(), "<guid isPermaLink=\"false\">acme/a</guid>");
        assert!(xml.contains("<pubDate>Sat, 6 Sep 2025 09:00:00 +0000</pubDate>"));
        assert!(xml.contains("    <language>en-us</language>"));
    }

    #[test]
    fn plain_guid_and_bad_entries() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>t</title>
  <item><title>a/x</title><link>https://github.com/a/x</link><description>d</description>
    <pubDate>Sat, 06 Sep 2025 09:00:00 +0000</pubDate><guid>a/x</guid></item>
  <item><title>a/y</title><link>https://github.com/a/y</link>
    <pubDate>not a date</pubDate><guid>a/y</guid></item>
  <item><title>a/z</title><pubDate>Sat, 06 Sep 2025 09:00:00 +0000</pubDate><guid>a/z</guid></item>
</channel></rss>"#;
        let decoded = decode(xml).unwrap();
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].guid, "a/x");
        assert_eq!(decoded.dropped, 2);
    }

    #[test]
    fn empty_channel_has_no_items() {
        let decoded = decode("<rss version=\"2.0\"><channel><title>t</title></channel></rss>").unwrap();
        assert!(decoded.items.is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode("this is not xml at all").is_err());
    }
}
