use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{get_field, json, ApiErr, ApiResp, Ctx, Result};
use crate::{
    aggregator::{Aggregator, Sections},
    models::{SectionResp, SuggestionResp},
};

/// Autocomplete query params.
#[derive(Debug, serde::Deserialize, Default)]
pub struct SuggestParams {
    /// Cursor position in the input, in chars.
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Suggestions for a field's partial input from all sources, grouped by
/// heading in the order the headings first arrived.
pub async fn autocomplete(
    State(ctx): State<Arc<Ctx>>,
    Path((field, q)): Path<(String, String)>,
    Query(params): Query<SuggestParams>,
) -> Result<ApiResp<Vec<SectionResp>>> {
    let field = get_field(&ctx, &field)?;

    let mut agg = Aggregator::new(ctx.sources(field));
    let mut sections = Sections::new();
    agg.input_changed(&q, params.offset);
    agg.settle(&mut sections).await;

    let out = sections
        .into_sections()
        .into_iter()
        .map(|b| SectionResp {
            heading: b.heading,
            suggestions: b.suggestions.iter().map(SuggestionResp::from).collect(),
        })
        .collect();

    Ok(json(out))
}

/// Autocomplete request with an empty query segment.
pub async fn missing_query() -> ApiErr {
    ApiErr::new("query is required", StatusCode::BAD_REQUEST)
}
