pub mod fields;
pub mod suggest;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    fields::{Field, Fields},
    sources::{LocalSource, Source},
};

/// Application context passed to all handlers.
pub struct Ctx {
    pub fields: Fields,
    /// Remote place source shared by all fields, if enabled.
    pub remote: Option<Arc<dyn Source>>,
    pub consts: Consts,
}

impl Ctx {
    /// Sources queried for a field: its own candidates, then the remote service.
    pub fn sources(&self, field: Arc<Field>) -> Vec<Arc<dyn Source>> {
        let mut out: Vec<Arc<dyn Source>> = vec![Arc::new(LocalSource::new(field))];
        if let Some(r) = &self.remote {
            out.push(r.clone());
        }
        out
    }
}

/// Application constants.
#[derive(Clone, Default)]
pub struct Consts {
    pub admin_username: String,
    pub admin_password: String,
    pub check_referrer: bool,
}

/// API response wrapper.
#[derive(Serialize)]
pub struct ApiResp<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiResp<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub fn json<T: Serialize>(data: T) -> ApiResp<T> {
    ApiResp {
        data: Some(data),
        message: None,
    }
}

/// API error type.
#[derive(Debug)]
pub struct ApiErr {
    pub message: String,
    pub status: StatusCode,
}

impl ApiErr {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

impl<E: std::fmt::Display> From<E> for ApiErr {
    fn from(err: E) -> Self {
        Self::new(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let json = Json(ApiResp::<()> {
            data: None,
            message: Some(self.message),
        });
        (self.status, json).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiErr>;

/// Look up a configured field, or 404.
pub fn get_field(ctx: &Ctx, name: &str) -> Result<Arc<Field>> {
    ctx.fields
        .get(name)
        .map_err(|e| ApiErr::new(e.to_string(), StatusCode::NOT_FOUND))
}
