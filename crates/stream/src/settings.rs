use serde::{Deserialize, Serialize};

/// Server-side defaults and limits applied to every search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_p2p_tolerance")]
    pub default_p2p_tolerance: f64,
    #[serde(default = "default_length_tolerance")]
    pub default_length_tolerance: f64,
    #[serde(default = "default_max_items")]
    pub default_max_items: usize,
    #[serde(default = "default_max_links")]
    pub default_max_links: usize,
    #[serde(default = "default_max_scrolls")]
    pub default_max_scrolls: u32,
    #[serde(default = "default_true")]
    pub default_headless: bool,
    #[serde(default)]
    pub default_slowmo_ms: u64,
    #[serde(default = "default_gender")]
    pub default_gender: String,
    #[serde(default = "default_groups")]
    pub default_groups: String,
    /// The only category that starts a crawl.
    #[serde(default = "default_category")]
    pub supported_category: String,
    /// Browse-mode matches need a seller with strictly more sales than this.
    #[serde(default = "default_browse_min_sold_count")]
    pub browse_min_sold_count: u32,
    /// Consecutive browse scans without new links before the run ends.
    #[serde(default = "default_empty_scan_limit")]
    pub empty_scan_limit: u32,
    /// Events buffered between the search worker and the client.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// How long a cancel for a not-yet-started search is remembered.
    #[serde(default = "default_pending_cancel_ttl_secs")]
    pub pending_cancel_ttl_secs: u64,
    /// Pending cancels kept at once; the oldest is evicted past this.
    #[serde(default = "default_max_pending_cancels")]
    pub max_pending_cancels: usize,
}

fn default_p2p_tolerance() -> f64 {
    1.0
}

fn default_length_tolerance() -> f64 {
    0.5
}

fn default_max_items() -> usize {
    40
}

fn default_max_links() -> usize {
    1000
}

fn default_max_scrolls() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_gender() -> String {
    "male".to_string()
}

fn default_groups() -> String {
    "tops".to_string()
}

fn default_category() -> String {
    "tops".to_string()
}

fn default_browse_min_sold_count() -> u32 {
    50
}

fn default_empty_scan_limit() -> u32 {
    2
}

fn default_channel_capacity() -> usize {
    64
}

fn default_pending_cancel_ttl_secs() -> u64 {
    300
}

fn default_max_pending_cancels() -> usize {
    1024
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_p2p_tolerance: default_p2p_tolerance(),
            default_length_tolerance: default_length_tolerance(),
            default_max_items: default_max_items(),
            default_max_links: default_max_links(),
            default_max_scrolls: default_max_scrolls(),
            default_headless: default_true(),
            default_slowmo_ms: 0,
            default_gender: default_gender(),
            default_groups: default_groups(),
            supported_category: default_category(),
            browse_min_sold_count: default_browse_min_sold_count(),
            empty_scan_limit: default_empty_scan_limit(),
            channel_capacity: default_channel_capacity(),
            pending_cancel_ttl_secs: default_pending_cancel_ttl_secs(),
            max_pending_cancels: default_max_pending_cancels(),
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("default_p2p_tolerance", self.default_p2p_tolerance),
            ("default_length_tolerance", self.default_length_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a finite number >= 0"));
            }
        }
        if self.default_max_items == 0 || self.default_max_links == 0 {
            return Err("default_max_items and default_max_links must be > 0".into());
        }
        if self.empty_scan_limit == 0 {
            return Err("empty_scan_limit must be > 0".into());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be > 0".into());
        }
        if self.max_pending_cancels == 0 {
            return Err("max_pending_cancels must be > 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SearchSettings::default().validate().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let settings: SearchSettings = serde_json::from_str(r#"{"default_max_items": 5}"#).unwrap();
        assert_eq!(settings.default_max_items, 5);
        assert_eq!(settings.default_max_links, 1000);
        assert_eq!(settings.browse_min_sold_count, 50);
        assert_eq!(settings.max_pending_cancels, 1024);
    }

    #[test]
    fn zero_capacity_rejected() {
        let settings = SearchSettings {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
