use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::{
    error::Error,
    feed::{Article, FeedSource},
    llm::openai::retrying_client,
};

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: Option<RssChannel>,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image: Option<String>,
}

impl From<RssItem> for Article {
    fn from(item: RssItem) -> Self {
        Article {
            title: item.title.unwrap_or_else(|| "No title".into()),
            link: item.link.unwrap_or_else(|| "No link".into()),
            description: item.description.unwrap_or_else(|| "No description".into()),
            pub_date: item.pub_date.unwrap_or_else(|| "No publication date".into()),
            image_url: item.image.filter(|i| !i.trim().is_empty()),
        }
    }
}

/// Parses an RSS 2.0 document into its items.
#[tracing::instrument(skip(xml))]
pub fn parse_rss(xml: &str) -> Result<Vec<Article>, Error> {
    let document = quick_xml::de::from_str::<RssDocument>(xml)?;

    let channel = document
        .channel
        .ok_or(Error::ParseError("No <channel> element found in RSS feed"))?;

    Ok(channel.items.into_iter().map(Article::from).collect())
}

pub struct HttpFeed {
    client: ClientWithMiddleware,
    url: String,
}

impl HttpFeed {
    pub const DEFAULT_FEED_URL: &str = "https://www.cbsnews.com/latest/rss/technology";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: retrying_client(3),
            url: url.into(),
        }
    }
}

impl FeedSource for HttpFeed {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch_feed(&self) -> anyhow::Result<Vec<Article>> {
        let xml = self
            .client
            .get(&self.url)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch RSS feed"))?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_rss(&xml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Technology - CBS News</title>
    <link>https://www.cbsnews.com/technology/</link>
    <image>
      <url>https://www.cbsnews.com/logo.png</url>
      <title>CBS News</title>
    </image>
    <item>
      <title><![CDATA[Chipmaker unveils new processor]]></title>
      <link>https://www.cbsnews.com/news/chipmaker-processor/</link>
      <description><![CDATA[The <b>fastest</b> chip yet.]]></description>
      <pubDate>Tue, 07 Oct 2025 09:30:00 -0400</pubDate>
      <image>https://assets.cbsnewsstatic.com/chip.jpg</image>
      <media:content url="https://assets.cbsnewsstatic.com/chip.jpg" medium="image"/>
    </item>
    <item>
      <link>https://www.cbsnews.com/news/untitled/</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parses_items_with_defaults() {
        let articles = parse_rss(FEED).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "Chipmaker unveils new processor");
        assert_eq!(first.link, "https://www.cbsnews.com/news/chipmaker-processor/");
        assert_eq!(first.description, "The <b>fastest</b> chip yet.");
        assert_eq!(first.pub_date, "Tue, 07 Oct 2025 09:30:00 -0400");
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://assets.cbsnewsstatic.com/chip.jpg")
        );

        let second = &articles[1];
        assert_eq!(second.title, "No title");
        assert_eq!(second.description, "No description");
        assert_eq!(second.pub_date, "No publication date");
        assert_eq!(second.image_url, None);
    }

    #[test]
    fn test_channel_without_items_is_empty() {
        let xml = "<rss><channel><title>Empty</title></channel></rss>";
        assert!(parse_rss(xml).unwrap().is_empty());
    }

    #[test]
    fn test_missing_channel_is_parse_error() {
        let err = parse_rss("<rss><notachannel/></rss>").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_invalid_xml_is_an_error() {
        assert!(parse_rss("<rss><channel><item>").is_err());
    }
}
