use std::sync::Arc;

use axum::extract::{Path, State};

use super::{get_field, json, ApiResp, Ctx, Result};
use crate::models::{FieldResp, ReindexResp};

/// List configured fields.
pub async fn get_fields(State(ctx): State<Arc<Ctx>>) -> Result<ApiResp<Vec<FieldResp>>> {
    let out = ctx
        .fields
        .iter()
        .map(|f| FieldResp {
            name: f.name.clone(),
            indexed: f.is_indexed(),
        })
        .collect();

    Ok(json(out))
}

/// Re-read a field's candidate list and rebuild its index.
pub async fn reindex(
    State(ctx): State<Arc<Ctx>>,
    Path(name): Path<String>,
) -> Result<ApiResp<ReindexResp>> {
    let field = get_field(&ctx, &name)?;
    let idx = field.rebuild()?;

    Ok(json(ReindexResp {
        name,
        candidates: idx.len(),
        phrases: idx.num_phrases(),
    }))
}
