//! HTML extraction for catalog and listing pages.
//!
//! Selectors follow the marketplace's current markup with generic fallbacks
//! after each site-specific one, so a partial redesign degrades to missing
//! fields instead of missing listings.

use chrono::{DateTime, Utc};
use matcher::ListingRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::time::{age_days_from, parse_iso_datetime, parse_relative_time};
use crate::urls::resolve_href;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector `{css}`: {e}"))
}

struct Selectors {
    product_link: Selector,
    description: Vec<Selector>,
    price_primary: Selector,
    price_fallbacks: Vec<Selector>,
    body: Selector,
    image_primary: Selector,
    image_any: Selector,
    seller: Selector,
    sold_signal: Selector,
    time: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    product_link: selector(r#"a[href^="/products/"]"#),
    description: vec![
        selector("p[class*='styles_textWrapper__']"),
        selector("[data-testid*='description'], [itemprop='description']"),
        selector("article, [class*='description']"),
    ],
    price_primary: selector("p[aria-label='Price']"),
    price_fallbacks: vec![
        selector("[data-testid*='price']"),
        selector("[class*='price']"),
        selector("[itemprop='price']"),
    ],
    body: selector("body"),
    image_primary: selector("img.styles_imageItem__UWJs6"),
    image_any: selector("img[srcset], img[src]"),
    seller: selector("a.styles_username__zh8fr"),
    sold_signal: selector("div.styles_signal__D2W6L p"),
    time: selector("time[datetime]"),
});

static PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([$£€]\s?\d[\d,]*(?:\.\d{2})?)").expect("price pattern is a valid regex")
});

static SOLD_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*sold").expect("sold pattern is a valid regex"));

/// Visible text of an element, with `<br>` rendered as a line break.
fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

/// Listings inside a "sold" list item or the "Sold items" section are not for sale.
fn is_sold_entry(anchor: ElementRef<'_>) -> bool {
    for ancestor in anchor.ancestors().filter_map(ElementRef::wrap) {
        match ancestor.value().name() {
            "li" => {
                if inner_text(ancestor).to_lowercase().contains("sold") {
                    return true;
                }
            }
            "section" => {
                let heading = ancestor
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .find(|el| matches!(el.value().name(), "h1" | "h2" | "h3" | "p"))
                    .map(inner_text);
                if heading.is_some_and(|h| h.trim().eq_ignore_ascii_case("sold items")) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Absolute listing URLs on a catalog page, in document order, unsold only.
///
/// Duplicates are kept; callers deduplicate across scroll passes.
pub fn extract_listing_links(html: &str, page_url: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&SELECTORS.product_link)
        .filter(|anchor| !is_sold_entry(*anchor))
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_href(page_url, href))
        .collect()
}

fn extract_description(doc: &Html) -> String {
    SELECTORS
        .description
        .iter()
        .find_map(|sel| first_text(doc, sel))
        .unwrap_or_default()
}

fn extract_price(doc: &Html) -> Option<String> {
    if let Some(price) = first_text(doc, &SELECTORS.price_primary) {
        return Some(price);
    }
    if let Some(price) = SELECTORS
        .price_fallbacks
        .iter()
        .find_map(|sel| first_text(doc, sel))
    {
        return Some(price);
    }
    let body = first_text(doc, &SELECTORS.body)?;
    PRICE
        .captures(&body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Last `srcset` candidate, which the site orders smallest to largest.
fn last_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .last()
        .and_then(|part| part.split_whitespace().next())
        .map(str::to_string)
}

fn extract_image(doc: &Html, page_url: &str) -> Option<String> {
    let primary = doc
        .select(&SELECTORS.image_primary)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .map(str::to_string);

    let src = primary.or_else(|| {
        let img = doc.select(&SELECTORS.image_any).next()?;
        img.value()
            .attr("srcset")
            .and_then(last_srcset_candidate)
            .or_else(|| img.value().attr("src").map(str::to_string))
    })?;
    resolve_href(page_url, &src).or(Some(src))
}

fn extract_sold_count(doc: &Html) -> Option<u32> {
    doc.select(&SELECTORS.sold_signal)
        .map(inner_text)
        .find_map(|text| {
            SOLD_COUNT
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
}

fn extract_listed_at(doc: &Html, now: DateTime<Utc>) -> (Option<String>, Option<f64>) {
    let Some(time) = doc.select(&SELECTORS.time).next() else {
        return (None, None);
    };

    let mut listed_at = time
        .value()
        .attr("datetime")
        .map(str::trim)
        .filter(|attr| !attr.is_empty())
        .map(str::to_string);
    let mut age_days = listed_at
        .as_deref()
        .and_then(parse_iso_datetime)
        .map(|ts| age_days_from(ts, now));

    if age_days.is_none() {
        if let Some(ts) = parse_relative_time(&inner_text(time), now) {
            age_days = Some(age_days_from(ts, now));
            listed_at = Some(ts.to_rfc3339());
        }
    }
    (listed_at, age_days)
}

/// Build a [`ListingRecord`] from a listing page.
///
/// Every field is optional on the page; missing ones stay `None` and a missing
/// description becomes the empty string.
pub fn extract_listing(html: &str, url: &str, now: DateTime<Utc>) -> ListingRecord {
    let doc = Html::parse_document(html);
    let (listed_at, age_days) = extract_listed_at(&doc, now);

    ListingRecord {
        url: url.to_string(),
        description: extract_description(&doc),
        price: extract_price(&doc),
        image: extract_image(&doc, url),
        listed_at,
        age_days,
        seller: first_text(&doc, &SELECTORS.seller),
        sold_count: extract_sold_count(&doc),
    }
}
