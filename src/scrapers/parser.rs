use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::types::{Selectors, SourceConfig};
use crate::error::{ConfigError, ValidationError};
use crate::models::{ListingDescriptor, ListingDetail};

/// Extracts listing data from search and detail pages using configured selectors
#[derive(Debug)]
pub struct PageParser {
    base_url: String,
    price_floor: i64,
    card: Selector,
    card_link_attr: String,
    card_modified_attr: String,
    price: Selector,
    surface: Selector,
    rooms: Selector,
    address: Option<Selector>,
    image: Selector,
    image_attr: String,
    expired: Option<Selector>,
}

fn compile(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::Invalid(format!("selector {:?}: {}", css, e)))
}

impl PageParser {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        let Selectors {
            card,
            card_link_attr,
            card_modified_attr,
            price,
            surface,
            rooms,
            address,
            image,
            image_attr,
            expired,
        } = &config.selectors;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            price_floor: config.price_floor,
            card: compile(card)?,
            card_link_attr: card_link_attr.clone(),
            card_modified_attr: card_modified_attr.clone(),
            price: compile(price)?,
            surface: compile(surface)?,
            rooms: compile(rooms)?,
            address: address.as_deref().map(compile).transpose()?,
            image: compile(image)?,
            image_attr: image_attr.clone(),
            expired: expired.as_deref().map(compile).transpose()?,
        })
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    /// Parse every listing card on a search results page.
    ///
    /// Cards without a link or a parsable modification time are skipped. The
    /// listing id is the last path segment of the link.
    pub fn parse_short_listings(&self, html: &str) -> Vec<ListingDescriptor> {
        let document = Html::parse_document(html);
        let mut descriptors = Vec::new();

        for (idx, card) in document.select(&self.card).enumerate() {
            let Some(href) = card.value().attr(&self.card_link_attr) else {
                debug!("Card {} has no {} attribute", idx, self.card_link_attr);
                continue;
            };

            let path = href.split(['?', '#']).next().unwrap_or(href);
            let id = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
            if id.is_empty() {
                debug!("Card {} link {:?} has no listing id", idx, href);
                continue;
            }

            let modified = card.value().attr(&self.card_modified_attr);
            let Some(last_modified) = modified.and_then(parse_timestamp) else {
                warn!("Skipped card {}: unparsable modification time {:?}", id, modified);
                continue;
            };

            descriptors.push(ListingDescriptor {
                id: id.to_string(),
                url: self.absolute(href),
                last_modified,
            });
        }

        debug!("Parsed {} listing cards", descriptors.len());
        descriptors
    }

    /// Parse and sanity-check a listing's detail page.
    pub fn parse_detail(&self, html: &str) -> Result<ListingDetail, ValidationError> {
        let document = Html::parse_document(html);

        if let Some(expired) = &self.expired {
            if document.select(expired).next().is_some() {
                return Err(ValidationError::Expired);
            }
        }

        let price_text = first_text(&document, &self.price).ok_or(ValidationError::MissingField("price"))?;
        let digits: String = price_text.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(ValidationError::MissingField("price"));
        }
        let price: i64 = digits.parse().map_err(|_| ValidationError::Unparsable {
            field: "price",
            value: price_text.clone(),
        })?;
        if price < self.price_floor {
            return Err(ValidationError::PriceBelowFloor {
                price,
                floor: self.price_floor,
            });
        }

        let surface_text = first_text(&document, &self.surface).ok_or(ValidationError::MissingField("surface"))?;
        let surface = first_number(&surface_text).ok_or(ValidationError::Unparsable {
            field: "surface",
            value: surface_text.clone(),
        })?;

        let rooms_text = first_text(&document, &self.rooms).ok_or(ValidationError::MissingField("rooms"))?;
        let rooms_count = first_number(&rooms_text)
            .filter(|rooms| *rooms >= 1.0)
            .map(|rooms| rooms.floor() as u32)
            .ok_or(ValidationError::Unparsable {
                field: "rooms",
                value: rooms_text.clone(),
            })?;

        let address = self
            .address
            .as_ref()
            .and_then(|selector| first_text(&document, selector));

        let mut seen = HashSet::new();
        let image_urls = document
            .select(&self.image)
            .filter_map(|img| img.value().attr(&self.image_attr))
            .map(|src| self.absolute(src))
            .filter(|url| seen.insert(url.clone()))
            .collect();

        Ok(ListingDetail {
            price,
            surface,
            rooms_count,
            image_urls,
            address,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Trimmed text of the first match, falling back to its aria-label.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    let element: ElementRef = document.select(selector).next()?;
    let text = element.text().collect::<String>().replace('\u{a0}', " ");
    let text = text.trim();

    if !text.is_empty() {
        return Some(text.to_string());
    }
    element
        .value()
        .attr("aria-label")
        .map(|label| label.replace("&nbsp;", " ").trim().to_string())
        .filter(|label| !label.is_empty())
}

/// First decimal number in `text`, accepting `,` as decimal separator ("35,5 m²").
fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    number.trim_end_matches([',', '.']).replace(',', ".").parse().ok()
}
