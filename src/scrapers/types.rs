use serde::{Deserialize, Serialize};

/// How a source's pages are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Plain HTTP requests
    #[default]
    Http,
    /// Headless Chrome, for pages rendered client-side
    Browser,
}

/// One marketplace to synchronize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Name used as the listing source, e.g. "booli"
    pub name: String,
    #[serde(default)]
    pub transport: Transport,
    /// Search results page listing every live listing
    pub search_url: String,
    /// Prefix for relative links found on the pages
    pub base_url: String,
    #[serde(default)]
    pub selectors: Selectors,
    /// Listings cheaper than this are considered implausible
    #[serde(default = "default_price_floor")]
    pub price_floor: i64,
    /// Seconds to let a browser-rendered page settle before reading it
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

fn default_price_floor() -> i64 {
    10_000
}

fn default_settle_secs() -> u64 {
    3
}

/// CSS selectors locating listing data on search and detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// One element per listing on the search page
    pub card: String,
    /// Attribute of the card holding the detail link
    pub card_link_attr: String,
    /// Attribute of the card holding the RFC 3339 modification time
    pub card_modified_attr: String,
    pub price: String,
    pub surface: String,
    pub rooms: String,
    pub address: Option<String>,
    pub image: String,
    pub image_attr: String,
    /// Present only on listings that are no longer for sale
    pub expired: Option<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            card: "a.object-card-link".to_string(),
            card_link_attr: "href".to_string(),
            card_modified_attr: "data-modified".to_string(),
            price: "span.object-card__price--logo".to_string(),
            surface: "li[aria-label*=kvadratmeter]".to_string(),
            rooms: "li[aria-label*=rum]".to_string(),
            address: Some("h1".to_string()),
            image: "img.listing-image".to_string(),
            image_attr: "src".to_string(),
            expired: Some("div.tag.sold".to_string()),
        }
    }
}
