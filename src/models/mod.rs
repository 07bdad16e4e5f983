use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheConfig,
    sources::Suggestion,
    suggest::{Span, DEFAULT_CATEGORY},
};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    pub remote: Option<RemoteConfig>,
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub field: BTreeMap<String, FieldConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: String,
    /// Reject autocomplete requests whose Referer host isn't the Host.
    #[serde(default)]
    pub check_referrer: bool,
}

/// Remote place-suggestion service.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_remote_url")]
    pub url: String,
    /// API key. If empty, $GMAPS_PLACE_AUTOCOMPLETE_KEY is used.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_remote_heading")]
    pub heading: String,
    /// "lat,lng" point near which results are biased.
    #[serde(default = "default_bias_location")]
    pub bias_location: String,
    /// Bias radius in metres.
    #[serde(default = "default_bias_radius")]
    pub bias_radius: u32,
    /// Request timeout (e.g. "5s").
    #[serde(default = "default_remote_timeout")]
    pub timeout: String,
}

fn default_remote_url() -> String {
    "https://maps.googleapis.com/maps/api/place/autocomplete/json".to_string()
}

fn default_remote_heading() -> String {
    "From Google Maps".to_string()
}

fn default_bias_location() -> String {
    "40.72797042,-73.98642518".to_string()
}

fn default_bias_radius() -> u32 {
    4500
}

fn default_remote_timeout() -> String {
    "5s".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_remote_url(),
            api_key: String::new(),
            heading: default_remote_heading(),
            bias_location: default_bias_location(),
            bias_radius: default_bias_radius(),
            timeout: default_remote_timeout(),
        }
    }
}

/// An input field with its own candidate list.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// CSV file of `text[,category]` rows.
    #[serde(default)]
    pub candidates: String,
    /// Inline candidates, indexed after the CSV rows.
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Max suggestions per category. 0 = unlimited.
    #[serde(default)]
    pub max_results: usize,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            candidates: String::new(),
            values: Vec::new(),
            default_category: default_category(),
            max_results: 0,
        }
    }
}

/// Suggestion as rendered in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResp {
    pub text: String,
    pub spans: Vec<Span>,
    pub secondary_text: String,
}

impl From<&Suggestion> for SuggestionResp {
    fn from(s: &Suggestion) -> Self {
        Self {
            text: s.text.clone(),
            spans: s.spans.spans().collect(),
            secondary_text: s.secondary_text.clone(),
        }
    }
}

/// One heading's worth of suggestions in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SectionResp {
    pub heading: String,
    pub suggestions: Vec<SuggestionResp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldResp {
    pub name: String,
    pub indexed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReindexResp {
    pub name: String,
    pub candidates: usize,
    pub phrases: usize,
}
