//! Instagram providers, tried in registry order.
//!
//! - `RapidApiProvider`: keyed scraper API (only registered with RAPIDAPI_KEY)
//! - `EmbedScrapeProvider`: public `/embed/` pages, no login
//! - `IgramProvider`: igram.io converter
//! - `SaveIgProvider`: saveig ajax search (HTML fragment in JSON)
//!
//! None of these endpoints is a stable contract; each adapter owns its own
//! parsing and answers `NoMatch` on anything it does not recognise.

use async_trait::async_trait;
use lazy_regex::regex;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::core::config::limits::TITLE_MAX_CHARS;
use crate::core::utils::truncate_chars;
use crate::download::source::{MediaProvider, ProviderOutcome, ProviderTuning};
use crate::download::types::{DownloadRequest, MediaLocator};

pub const RAPIDAPI_HOST: &str = "instagram-scrapper-api-posts-reels-stories-downloader.p.rapidapi.com";
pub const RAPIDAPI_ENDPOINT: &str =
    "https://instagram-scrapper-api-posts-reels-stories-downloader.p.rapidapi.com/instagram/";
pub const INSTAGRAM_BASE: &str = "https://www.instagram.com";
pub const IGRAM_ENDPOINT: &str = "https://api.igram.io/api/convert";
pub const SAVEIG_ENDPOINT: &str = "https://v3.saveig.app/api/ajaxSearch";

/// Extracts the post shortcode from `/p/`, `/reel/`, `/reels/` and `/tv/`
/// links, with or without a `/<username>/` prefix.
pub fn extract_shortcode(url: &str) -> Option<&str> {
    regex!(r"instagram\.com/(?:[A-Za-z0-9_.]+/)?(?:p|reel|reels|tv)/([A-Za-z0-9_-]+)")
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Decodes JSON string escapes (`\u0026`, `\/`) in a value captured out of
/// a script blob.
pub fn unescape_json_str(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw))
        .unwrap_or_else(|_| raw.replace("\\u0026", "&").replace("\\/", "/"))
}

fn at_handle(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

fn caption(raw: Option<&str>) -> String {
    raw.map(|c| truncate_chars(c.trim(), TITLE_MAX_CHARS)).unwrap_or_default()
}

// ==================== RapidAPI ====================

pub struct RapidApiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    tuning: ProviderTuning,
}

impl RapidApiProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self::with_endpoint(client, api_key, RAPIDAPI_ENDPOINT)
    }

    pub fn with_endpoint(client: Client, api_key: String, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            tuning: ProviderTuning::http(vec![("X-RapidAPI-Host", RAPIDAPI_HOST)]),
        }
    }
}

fn str_field<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Understands the response shapes the scraper API has been seen to use:
/// top-level url fields, a `data` object or array, or a `media` array.
pub fn parse_rapidapi(body: &Value) -> Option<MediaLocator> {
    const URL_KEYS: &[&str] = &["video_url", "download_url", "url"];

    let mut media_url = str_field(body, URL_KEYS).map(str::to_string);
    let mut title = None;
    let mut author = None;

    if media_url.is_none() {
        match body.get("data") {
            Some(data @ Value::Object(_)) => {
                media_url = str_field(data, &["video_url", "download_url"]).map(str::to_string);
                title = str_field(data, &["caption"]).map(str::to_string);
                author = str_field(data, &["username"]).map(str::to_string);
            }
            Some(Value::Array(items)) => {
                media_url = items
                    .first()
                    .and_then(|i| str_field(i, &["video_url", "download_url"]))
                    .map(str::to_string);
            }
            _ => {}
        }
    }

    if media_url.is_none() {
        if let Some(items) = body.get("media").and_then(Value::as_array) {
            let video = items.iter().find(|m| {
                m.get("type").and_then(Value::as_str) == Some("video")
                    || str_field(m, &["url"]).is_some_and(|u| u.to_lowercase().contains("video"))
            });
            media_url = video
                .and_then(|m| str_field(m, &["url", "video_url"]))
                .or_else(|| items.first().and_then(|m| str_field(m, &["url"])))
                .map(str::to_string);
        }
    }

    let title = title.or_else(|| str_field(body, &["caption", "title"]).map(str::to_string));
    let author = author.or_else(|| str_field(body, &["username", "author"]).map(str::to_string));

    media_url.map(|u| {
        MediaLocator::new(u)
            .title(caption(title.as_deref()))
            .uploader(author.as_deref().map(at_handle).unwrap_or_default())
    })
}

#[async_trait]
impl MediaProvider for RapidApiProvider {
    fn id(&self) -> &'static str {
        "instagram-rapidapi"
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        let req = self
            .tuning
            .apply(self.client.get(&self.endpoint))
            .header("X-RapidAPI-Key", &self.api_key)
            .query(&[("url", request.source_url.as_str())]);

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) => return ProviderOutcome::no_match(format!("rapidapi request failed: {}", e)),
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return ProviderOutcome::no_match("rapidapi rate limit reached"),
            other => return ProviderOutcome::no_match(format!("rapidapi returned {}", other)),
        }

        match response.json::<Value>().await {
            Ok(body) => match parse_rapidapi(&body) {
                Some(loc) => ProviderOutcome::Located(loc),
                None => ProviderOutcome::no_match("rapidapi response had no video url"),
            },
            Err(e) => ProviderOutcome::no_match(format!("rapidapi response not understood: {}", e)),
        }
    }
}

// ==================== Embed scrape ====================

pub struct EmbedScrapeProvider {
    client: Client,
    base_url: String,
    tuning: ProviderTuning,
}

impl EmbedScrapeProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, INSTAGRAM_BASE)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tuning: ProviderTuning::http(vec![
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                ),
                ("Accept-Language", "en-US,en;q=0.5"),
            ]),
        }
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        let response = self.tuning.apply(self.client.get(url)).send().await.ok()?;
        if !response.status().is_success() {
            log::debug!("embed page {} returned {}", url, response.status());
            return None;
        }
        response.text().await.ok()
    }
}

/// Finds a video URL plus caption and author in an embed page.
pub fn parse_embed_html(html: &str) -> Option<MediaLocator> {
    let patterns = [
        regex!(r#""video_url"\s*:\s*"([^"]+)""#),
        regex!(r#""contentUrl"\s*:\s*"([^"]+)""#),
        regex!(r#"property="og:video"\s+content="([^"]+)""#),
        regex!(r#""src"\s*:\s*"([^"]*?\.mp4[^"]*)""#),
    ];

    let raw_url = patterns
        .iter()
        .find_map(|re| re.captures(html).and_then(|c| c.get(1)))?
        .as_str();
    let media_url = unescape_json_str(raw_url).replace("&amp;", "&");

    let caption_text = regex!(r#""caption"\s*:\s*\{[^}]*"text"\s*:\s*"([^"]*)""#)
        .captures(html)
        .or_else(|| regex!(r#"(?s)"edge_media_to_caption".*?"text"\s*:\s*"([^"]*)""#).captures(html))
        .and_then(|c| c.get(1))
        .map(|m| unescape_json_str(m.as_str()));

    let author = regex!(r#""username"\s*:\s*"([^"]+)""#)
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| at_handle(m.as_str()))
        .unwrap_or_default();

    Some(
        MediaLocator::new(media_url)
            .title(caption(caption_text.as_deref()))
            .uploader(author),
    )
}

#[async_trait]
impl MediaProvider for EmbedScrapeProvider {
    fn id(&self) -> &'static str {
        "instagram-embed"
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        let Some(code) = extract_shortcode(&request.source_url) else {
            return ProviderOutcome::no_match("no shortcode in link");
        };

        let pages = [
            format!("{}/reel/{}/embed/captioned/", self.base_url, code),
            format!("{}/p/{}/embed/", self.base_url, code),
        ];

        for page in &pages {
            if let Some(loc) = self.fetch_page(page).await.as_deref().and_then(parse_embed_html) {
                log::info!("📸 Embed page resolved {}", code);
                return ProviderOutcome::Located(loc);
            }
        }

        ProviderOutcome::no_match("embed pages had no video url")
    }
}

// ==================== igram ====================

pub struct IgramProvider {
    client: Client,
    endpoint: String,
    tuning: ProviderTuning,
}

impl IgramProvider {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, IGRAM_ENDPOINT)
    }

    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            tuning: ProviderTuning::http(vec![
                ("Accept", "application/json"),
                ("Origin", "https://igram.io"),
                ("Referer", "https://igram.io/"),
            ]),
        }
    }
}

/// First item carrying a url in `result` or `data`.
pub fn parse_igram(body: &Value) -> Option<MediaLocator> {
    ["result", "data"]
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_array))
        .flatten()
        .find_map(|item| str_field(item, &["url", "download_url"]))
        .map(MediaLocator::new)
}

#[async_trait]
impl MediaProvider for IgramProvider {
    fn id(&self) -> &'static str {
        "instagram-igram"
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        let req = self
            .tuning
            .apply(self.client.post(&self.endpoint))
            .json(&serde_json::json!({ "url": request.source_url }));

        let response = match req.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => return ProviderOutcome::no_match(format!("igram returned {}", r.status())),
            Err(e) => return ProviderOutcome::no_match(format!("igram request failed: {}", e)),
        };

        match response.json::<Value>().await.ok().as_ref().and_then(parse_igram) {
            Some(loc) => ProviderOutcome::Located(loc),
            None => ProviderOutcome::no_match("igram response had no media"),
        }
    }
}

// ==================== saveig ====================

pub struct SaveIgProvider {
    client: Client,
    endpoint: String,
    tuning: ProviderTuning,
}

impl SaveIgProvider {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, SAVEIG_ENDPOINT)
    }

    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            tuning: ProviderTuning::http(vec![
                ("Accept", "application/json, text/javascript, */*; q=0.01"),
                ("X-Requested-With", "XMLHttpRequest"),
            ]),
        }
    }
}

/// Pulls the download link and caption out of the HTML fragment in `data`.
pub fn parse_saveig(body: &Value) -> Option<MediaLocator> {
    if body.get("status").and_then(Value::as_str) != Some("ok") {
        return None;
    }
    let html = body.get("data").and_then(Value::as_str)?;

    let link = regex!(r#"href="(https://[^"]+)"[^>]*class="[^"]*btn[^"]*""#)
        .captures(html)
        .or_else(|| regex!(r#"<a[^>]*href="(https://[^"]+\.mp4[^"]*)""#).captures(html))
        .or_else(|| regex!(r#"(?s)href="(https://[^"]+)"[^>]*>.*?Download"#).captures(html))
        .and_then(|c| c.get(1))?
        .as_str()
        .replace("&amp;", "&");

    let title = regex!(r#"class="[^"]*text[^"]*"[^>]*>([^<]+)<"#)
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| caption(Some(m.as_str())))
        .unwrap_or_default();

    Some(MediaLocator::new(link).title(title))
}

#[async_trait]
impl MediaProvider for SaveIgProvider {
    fn id(&self) -> &'static str {
        "instagram-saveig"
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        let form = [("q", request.source_url.as_str()), ("t", "media"), ("lang", "en")];
        let req = self.tuning.apply(self.client.post(&self.endpoint)).form(&form);

        let response = match req.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => return ProviderOutcome::no_match(format!("saveig returned {}", r.status())),
            Err(e) => return ProviderOutcome::no_match(format!("saveig request failed: {}", e)),
        };

        match response.json::<Value>().await.ok().as_ref().and_then(parse_saveig) {
            Some(loc) => ProviderOutcome::Located(loc),
            None => ProviderOutcome::no_match("saveig response had no download link"),
        }
    }
}
