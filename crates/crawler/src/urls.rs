use url::Url;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;

/// Where a run starts browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogTarget {
    /// One seller's shop, newest first, filtered by group and gender.
    Seller {
        handle: String,
        groups: String,
        gender: String,
    },
    /// The configured global browse feed.
    Browse,
}

impl CatalogTarget {
    /// Seller mode when `seller` is non-blank after trimming, browse otherwise.
    pub fn from_seller(seller: Option<&str>, groups: &str, gender: &str) -> Self {
        match seller.map(normalize_seller_handle) {
            Some(handle) if !handle.is_empty() => CatalogTarget::Seller {
                handle,
                groups: groups.to_string(),
                gender: gender.to_string(),
            },
            _ => CatalogTarget::Browse,
        }
    }

    pub fn is_seller(&self) -> bool {
        matches!(self, CatalogTarget::Seller { .. })
    }

    pub fn seller(&self) -> Option<&str> {
        match self {
            CatalogTarget::Seller { handle, .. } => Some(handle),
            CatalogTarget::Browse => None,
        }
    }

    pub fn url(&self, config: &CrawlerConfig) -> Result<String, CrawlError> {
        match self {
            CatalogTarget::Seller {
                handle,
                groups,
                gender,
            } => seller_catalog_url(&config.base_url, handle, groups, gender),
            CatalogTarget::Browse => Ok(config.browse_url.clone()),
        }
    }
}

/// Strip whitespace, a leading `@` and surrounding slashes from a handle.
pub fn normalize_seller_handle(seller: &str) -> String {
    seller
        .trim()
        .trim_start_matches('@')
        .trim_matches('/')
        .to_string()
}

/// `<base>/<seller>/?sort=recent&groups=<groups>[&gender=<gender>]`
pub fn seller_catalog_url(
    base: &str,
    seller: &str,
    groups: &str,
    gender: &str,
) -> Result<String, CrawlError> {
    let handle = normalize_seller_handle(seller);
    if handle.is_empty() {
        return Err(CrawlError::InvalidUrl("seller handle is empty".into()));
    }

    let base = Url::parse(base).map_err(|e| CrawlError::InvalidUrl(format!("{base}: {e}")))?;
    let mut url = base
        .join(&format!("{handle}/"))
        .map_err(|e| CrawlError::InvalidUrl(format!("{handle}: {e}")))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("sort", "recent");
        query.append_pair("groups", groups);
        if !gender.trim().is_empty() {
            query.append_pair("gender", gender.trim());
        }
    }
    Ok(url.to_string())
}

/// Resolve an `href` against the page it was found on.
pub fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href.trim()).ok().map(String::from)
}

/// The same listing page with `page=<n>` set, used to emulate scrolling.
pub fn with_page_number(page_url: &str, page: u32) -> Result<String, CrawlError> {
    let mut url =
        Url::parse(page_url).map_err(|e| CrawlError::InvalidUrl(format!("{page_url}: {e}")))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| *k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (k, v) in &kept {
            query.append_pair(k, v);
        }
        query.append_pair("page", &page.to_string());
    }
    Ok(url.to_string())
}
