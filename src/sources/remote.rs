use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Batches, Query, Source, Suggestion};
use crate::{
    cache::{make_suggest_cache_key, Cache},
    suggest::MatchSpans,
};

/// Provider status for a request that returned successfully with no results.
const STATUS_OK: &str = "OK";
const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("provider status: {0}")]
    Status(String),
}

/// Request sent to the place suggestion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceRequest {
    pub input: String,
    /// Cursor position in `input`.
    pub offset: Option<usize>,
    /// "lat,lng" point to bias results towards.
    pub location: String,
    /// Bias radius in metres.
    pub radius: u32,
}

/// A matched range in a prediction's main text, in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRange {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub main_text: String,
    pub matched: Vec<MatchedRange>,
    pub secondary_text: Option<String>,
}

/// The place suggestion service. Implementations report failure through
/// `Err`, never by an empty success.
#[async_trait]
pub trait PlacesClient: Send + Sync {
    async fn autocomplete(&self, req: &PlaceRequest) -> Result<Vec<Prediction>, RemoteError>;
}

// Raw wire format of the provider's autocomplete JSON.
#[derive(Debug, Deserialize)]
struct RawResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<RawPrediction>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    structured_formatting: RawFormatting,
}

#[derive(Debug, Deserialize)]
struct RawFormatting {
    main_text: String,
    #[serde(default)]
    main_text_matched_substrings: Vec<MatchedRange>,
    #[serde(default)]
    secondary_text: Option<String>,
}

/// Parse the provider's JSON body into predictions or a status error.
pub fn parse_response(body: &str) -> Result<Vec<Prediction>, RemoteError> {
    let raw: RawResponse = serde_json::from_str(body)?;

    match raw.status.as_str() {
        STATUS_OK => Ok(raw
            .predictions
            .into_iter()
            .map(|p| Prediction {
                main_text: p.structured_formatting.main_text,
                matched: p.structured_formatting.main_text_matched_substrings,
                secondary_text: p.structured_formatting.secondary_text,
            })
            .collect()),
        STATUS_ZERO_RESULTS => Ok(Vec::new()),
        _ => Err(RemoteError::Status(match raw.error_message {
            Some(msg) => format!("{}: {}", raw.status, msg),
            None => raw.status,
        })),
    }
}

/// HTTP client for the Google Places autocomplete web service.
pub struct GooglePlaces {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GooglePlaces {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("placesuggest/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl PlacesClient for GooglePlaces {
    async fn autocomplete(&self, req: &PlaceRequest) -> Result<Vec<Prediction>, RemoteError> {
        let radius = req.radius.to_string();
        let mut params = vec![
            ("input", req.input.as_str()),
            ("key", self.api_key.as_str()),
            ("location", req.location.as_str()),
            ("radius", radius.as_str()),
        ];

        let offset = req.offset.map(|o| o.to_string());
        if let Some(o) = &offset {
            params.push(("offset", o.as_str()));
        }

        let body = self
            .http
            .get(&self.url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_response(&body)
    }
}

/// Split `text` into match spans from provider-reported ranges. Ranges are
/// expected in ascending order; any overlap with an earlier range, or any
/// part past the end of the text, is clamped away.
pub fn spans_from_ranges(text: &str, ranges: &[MatchedRange]) -> MatchSpans {
    // Char offset -> byte offset, with a trailing slot for the end.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let at = |n: usize| bounds[n.min(bounds.len() - 1)];

    let mut spans = MatchSpans::new();
    let mut last = 0;
    for r in ranges {
        let start = r.offset.max(last);
        let end = r.offset.saturating_add(r.length).max(start);

        spans.append(&text[at(last)..at(start)], false);
        spans.append(&text[at(start)..at(end)], true);
        last = end;
    }
    spans.append(&text[at(last)..], false);

    spans
}

/// Suggestions from the remote place service, emitted as a single batch.
pub struct RemoteSource {
    client: Arc<dyn PlacesClient>,
    heading: String,
    location: String,
    radius: u32,
    cache: Option<Arc<Cache>>,
}

impl RemoteSource {
    pub fn new(
        client: Arc<dyn PlacesClient>,
        heading: &str,
        location: &str,
        radius: u32,
        cache: Option<Arc<Cache>>,
    ) -> Self {
        Self {
            client,
            heading: heading.to_string(),
            location: location.to_string(),
            radius,
            cache,
        }
    }

    async fn fetch(&self, query: &Query) -> Option<Vec<Suggestion>> {
        let offset = query.cursor.unwrap_or_else(|| query.text.chars().count());
        let key = make_suggest_cache_key(&query.text, offset);

        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(&key) {
                if let Ok(cached) = rmp_serde::from_slice::<Vec<Suggestion>>(&data) {
                    return Some(cached);
                }
            }
        }

        let req = PlaceRequest {
            input: query.text.clone(),
            offset: query.cursor,
            location: self.location.clone(),
            radius: self.radius,
        };

        // Errors aren't retried: the user will probably type another
        // character soon anyway.
        let predictions = match self.client.autocomplete(&req).await {
            Ok(p) => p,
            Err(e) => {
                log::info!("remote suggestions for '{}': {}", query.text, e);
                return None;
            }
        };

        let out: Vec<Suggestion> = predictions
            .into_iter()
            .map(|p| Suggestion {
                spans: spans_from_ranges(&p.main_text, &p.matched),
                text: p.main_text,
                secondary_text: p.secondary_text.unwrap_or_default(),
            })
            .collect();

        if let Some(cache) = &self.cache {
            if let Ok(encoded) = rmp_serde::to_vec_named(&out) {
                cache.put(&key, &encoded);
            }
        }

        Some(out)
    }
}

#[async_trait]
impl Source for RemoteSource {
    fn name(&self) -> &str {
        &self.heading
    }

    async fn suggest(&self, query: &Query, out: &Batches) {
        match self.fetch(query).await {
            Some(suggestions) if !suggestions.is_empty() => out.send(&self.heading, suggestions),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::sources::collect;
    use std::sync::Mutex;

    /// Fake service that replays a canned result and records requests.
    struct FakePlaces {
        result: fn() -> Result<Vec<Prediction>, RemoteError>,
        calls: Mutex<Vec<PlaceRequest>>,
    }

    impl FakePlaces {
        fn new(result: fn() -> Result<Vec<Prediction>, RemoteError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PlacesClient for FakePlaces {
        async fn autocomplete(&self, req: &PlaceRequest) -> Result<Vec<Prediction>, RemoteError> {
            self.calls.lock().unwrap().push(req.clone());
            (self.result)()
        }
    }

    fn park_ave() -> Result<Vec<Prediction>, RemoteError> {
        Ok(vec![
            Prediction {
                main_text: "Park Ave".to_string(),
                matched: vec![MatchedRange {
                    offset: 0,
                    length: 4,
                }],
                secondary_text: Some("New York, NY, USA".to_string()),
            },
            Prediction {
                main_text: "Park Pl".to_string(),
                matched: vec![MatchedRange {
                    offset: 0,
                    length: 4,
                }],
                secondary_text: None,
            },
        ])
    }

    fn remote(client: Arc<FakePlaces>, cache: Option<Arc<Cache>>) -> RemoteSource {
        RemoteSource::new(client, "From Google Maps", "40.7,-73.9", 4500, cache)
    }

    #[test]
    fn test_spans_from_ranges() {
        let s = spans_from_ranges("Park Ave", &[MatchedRange { offset: 0, length: 4 }]);
        assert_eq!(s.parts(), &["", "Park", " Ave"]);

        let s = spans_from_ranges(
            "Union Square West",
            &[
                MatchedRange { offset: 0, length: 5 },
                MatchedRange { offset: 6, length: 3 },
            ],
        );
        assert_eq!(s.parts(), &["", "Union", " ", "Squ", "are West"]);

        // Adjacent ranges coalesce.
        let s = spans_from_ranges("abcdef", &[
            MatchedRange { offset: 1, length: 2 },
            MatchedRange { offset: 3, length: 1 },
        ]);
        assert_eq!(s.parts(), &["a", "bcd", "ef"]);

        assert_eq!(spans_from_ranges("Park", &[]).parts(), &["Park"]);
    }

    #[test]
    fn test_spans_from_ranges_clamped() {
        let s = spans_from_ranges("Café Ave", &[
            MatchedRange { offset: 2, length: 2 },
            MatchedRange { offset: 1, length: 2 },
            MatchedRange { offset: 6, length: 50 },
        ]);
        assert_eq!(s.text(), "Café Ave");
        assert_eq!(s.parts(), &["Ca", "fé", " A", "ve"]);
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "status": "OK",
            "predictions": [{
                "description": "Park Ave, New York, NY, USA",
                "structured_formatting": {
                    "main_text": "Park Ave",
                    "main_text_matched_substrings": [{"offset": 0, "length": 4}],
                    "secondary_text": "New York, NY, USA"
                }
            }, {
                "structured_formatting": {"main_text": "Parkchester"}
            }]
        }"#;
        let got = parse_response(body).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].main_text, "Park Ave");
        assert_eq!(got[0].matched, vec![MatchedRange { offset: 0, length: 4 }]);
        assert_eq!(got[0].secondary_text.as_deref(), Some("New York, NY, USA"));
        assert!(got[1].matched.is_empty());
        assert!(got[1].secondary_text.is_none());

        assert!(parse_response(r#"{"status": "ZERO_RESULTS"}"#).unwrap().is_empty());
        assert!(matches!(
            parse_response(r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#),
            Err(RemoteError::Status(s)) if s == "REQUEST_DENIED: bad key"
        ));
        assert!(matches!(parse_response("<html>"), Err(RemoteError::Decode(_))));
    }

    #[tokio::test]
    async fn test_single_batch() {
        let client = FakePlaces::new(park_ave);
        let src = remote(client.clone(), None);

        let got = collect(&src, Query { text: "park".into(), cursor: Some(4) }).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].heading, "From Google Maps");

        let s = &got[0].suggestions;
        assert_eq!(s[0].spans.parts(), &["", "Park", " Ave"]);
        assert_eq!(s[0].secondary_text, "New York, NY, USA");
        assert_eq!(s[1].secondary_text, "");

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, "park");
        assert_eq!(calls[0].offset, Some(4));
        assert_eq!(calls[0].radius, 4500);
    }

    #[tokio::test]
    async fn test_failure_and_empty_emit_nothing() {
        let src = remote(FakePlaces::new(|| Err(RemoteError::Status("OVER_QUERY_LIMIT".into()))), None);
        assert!(collect(&src, Query::new("park")).await.is_empty());

        let src = remote(FakePlaces::new(|| Ok(Vec::new())), None);
        assert!(collect(&src, Query::new("park")).await.is_empty());
    }

    #[tokio::test]
    async fn test_cached() {
        let cache = Arc::new(
            Cache::new(&CacheConfig {
                enabled: true,
                ..Default::default()
            })
            .unwrap(),
        );
        let client = FakePlaces::new(park_ave);
        let src = remote(client.clone(), Some(cache));

        let a = collect(&src, Query::new("park")).await;
        let b = collect(&src, Query::new("park")).await;
        assert_eq!(a, b);
        assert_eq!(client.calls.lock().unwrap().len(), 1);

        // Different cursor, different key.
        collect(&src, Query { text: "park".into(), cursor: Some(2) }).await;
        assert_eq!(client.calls.lock().unwrap().len(), 2);
    }
}
