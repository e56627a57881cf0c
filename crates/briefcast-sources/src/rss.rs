//! RSS feed source — pull-parsed channel items, HTML-stripped summaries.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;

use briefcast_core::Result;
use briefcast_core::error::BriefcastError;
use briefcast_core::types::Story;

use crate::ContentSource;

/// Items kept per feed.
const MAX_ITEMS_PER_FEED: usize = 10;
/// Summary length cap after tag stripping.
const MAX_SUMMARY_CHARS: usize = 300;

pub struct RssSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl RssSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ContentSource for RssSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Story>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let items = parse_rss_items(&body, MAX_ITEMS_PER_FEED)?;
        let stories: Vec<Story> = items
            .into_iter()
            .map(|item| {
                let summary = strip_html(&item.description);
                Story {
                    title: item.title,
                    url: (!item.link.is_empty()).then_some(item.link),
                    score: None,
                    summary: (!summary.is_empty())
                        .then(|| briefcast_core::types::truncate_chars(&summary, MAX_SUMMARY_CHARS)),
                    source: self.name.clone(),
                }
            })
            .collect();

        tracing::info!("Fetched {} {} stories", stories.len(), self.name);
        Ok(stories)
    }
}

#[derive(Default)]
struct RssItem {
    title: String,
    link: String,
    description: String,
}

/// Pull-parse `<item>` elements out of an RSS document.
fn parse_rss_items(xml: &str, max: usize) -> Result<Vec<RssItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<RssItem> = None;
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => current = Some(RssItem::default()),
                b"title" => field = Some("title"),
                b"link" => field = Some("link"),
                b"description" => field = Some("description"),
                _ => field = None,
            },
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| BriefcastError::parse(format!("RSS text: {e}")))?;
                    push_field(item, field, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    push_field(item, field, &text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" => {
                    if let Some(item) = current.take() {
                        items.push(item);
                        if items.len() >= max {
                            break;
                        }
                    }
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(BriefcastError::parse(format!("RSS parse: {e}"))),
        }
    }

    Ok(items)
}

fn push_field(item: &mut RssItem, field: &str, text: &str) {
    let target = match field {
        "title" => &mut item.title,
        "link" => &mut item.link,
        _ => &mut item.description,
    };
    target.push_str(text);
}

/// Drop HTML tags, collapsing the remainder.
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <item>
      <title>Startup raises $40M</title>
      <link>https://example.com/a</link>
      <description><![CDATA[<p>A <b>Series B</b> round led by Example Capital.</p>]]></description>
    </item>
    <item>
      <title>New dev tool launches</title>
      <link>https://example.com/b</link>
      <description>Plain text summary.</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_items() {
        let items = parse_rss_items(FEED, 10).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Startup raises $40M");
        assert_eq!(items[0].link, "https://example.com/a");
        assert!(items[0].description.contains("Series B"));
        assert_eq!(items[1].description, "Plain text summary.");
    }

    #[test]
    fn test_item_cap() {
        let items = parse_rss_items(FEED, 1).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>A <b>Series B</b> round.</p>"),
            "A Series B round."
        );
        assert_eq!(strip_html("no tags"), "no tags");
    }

    #[test]
    fn test_channel_title_not_an_item() {
        // The channel-level <title> must not leak into items.
        let items = parse_rss_items(FEED, 10).unwrap();
        assert!(items.iter().all(|i| i.title != "Example Feed"));
    }
}
