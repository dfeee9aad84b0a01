use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;

use crate::{
    feed::{ArticleContent, ArticleFetcher},
    llm::openai::retrying_client,
};

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>")
        .unwrap()
});
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*)</article\s*>").unwrap());
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

const MAX_CONTENT_CHARS: usize = 5000;

/// Numeric references that name no valid character are left as written.
fn decode_numeric_entities(text: &str) -> String {
    NUMERIC_ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let digits = &caps[1];
            let code = match digits.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => digits.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entities(text: &str) -> String {
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'");
    // `&amp;` last so "&amp;#39;" stays a literal "&#39;"
    decode_numeric_entities(&text).replace("&amp;", "&")
}

fn to_plain_text(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, " ");
    let text = decode_entities(&text);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Reduces an HTML page to its title and readable text.
///
/// Prefers the `<article>` element, falls back to `<body>`, then to the whole
/// document. The text is capped at 5000 characters.
pub fn extract_article_text(html: &str, url: &str) -> ArticleContent {
    let html = SCRIPT_STYLE_RE.replace_all(html, " ");
    let html = COMMENT_RE.replace_all(&html, " ");

    let title = TITLE_RE
        .captures(&html)
        .and_then(|c| c.get(1))
        .map(|m| to_plain_text(m.as_str()))
        .unwrap_or_default();

    let fragment = ARTICLE_RE
        .captures(&html)
        .or_else(|| BODY_RE.captures(&html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(&*html);

    ArticleContent {
        title,
        url: url.to_string(),
        content: to_plain_text(fragment).chars().take(MAX_CONTENT_CHARS).collect(),
    }
}

pub struct HttpArticleFetcher {
    client: ClientWithMiddleware,
    timeout: Duration,
}

impl Default for HttpArticleFetcher {
    fn default() -> Self {
        Self {
            client: retrying_client(2),
            timeout: Duration::from_secs(30),
        }
    }
}

/// The readable text of a page's `<body>` (or of the whole document when
/// there is none), uncapped.
pub fn extract_body_text(html: &str) -> String {
    let html = SCRIPT_STYLE_RE.replace_all(html, " ");
    let html = COMMENT_RE.replace_all(&html, " ");

    let fragment = BODY_RE
        .captures(&html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(&*html);

    to_plain_text(fragment)
}

impl HttpArticleFetcher {
    /// Like [`ArticleFetcher::fetch_article`] but fails instead of
    /// describing the error, and keeps the full body text.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_body_text(&self, url: &str) -> anyhow::Result<String> {
        let html = self
            .fetch_html(url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, url, "Failed to fetch page"))?;
        Ok(extract_body_text(&html))
    }

    async fn fetch_html(&self, url: &str) -> anyhow::Result<String> {
        Ok(self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

impl ArticleFetcher for HttpArticleFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch_article(&self, url: &str) -> ArticleContent {
        match self.fetch_html(url).await {
            Ok(html) => extract_article_text(&html, url),
            Err(e) => {
                tracing::error!(error = %e, url, "Failed to fetch article content");
                ArticleContent {
                    title: "Error".to_string(),
                    url: url.to_string(),
                    content: format!("Failed to fetch content: {e}"),
                }
            }
        }
    }
}
