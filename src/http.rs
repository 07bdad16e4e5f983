use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::handlers::{fields, suggest, Ctx};

/// Initialize HTTP routes.
pub fn init_handlers(ctx: Arc<Ctx>) -> Router {
    // Public API routes.
    let mut suggest_routes = Router::new()
        .route("/api/autocomplete/{field}/{q}", get(suggest::autocomplete))
        .route("/api/autocomplete/{field}/", get(suggest::missing_query));

    if ctx.consts.check_referrer {
        suggest_routes = suggest_routes.route_layer(middleware::from_fn(referrer_middleware));
        log::info!("referrer check enabled on autocomplete routes");
    }

    let pub_routes = Router::new().route("/api/fields", get(fields::get_fields));

    // Admin (requires auth).
    let admin_routes = Router::new()
        .route("/api/fields/{field}/reindex", post(fields::reindex))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    Router::new()
        .merge(suggest_routes)
        .merge(pub_routes)
        .merge(admin_routes)
        .with_state(ctx)
}

/// BasicAuth middleware checks for admin username & password defined in ctx constants.
async fn auth_middleware(
    State(ctx): State<Arc<Ctx>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // No credentials configured means the admin API is off.
    if !ctx.consts.admin_username.is_empty()
        && validate_basic_auth(
            request.headers(),
            &ctx.consts.admin_username,
            &ctx.consts.admin_password,
        )
    {
        return next.run(request).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"placesuggest\"")],
        "unauthorized",
    )
        .into_response()
}

/// Reject requests that weren't made from a page on this host.
async fn referrer_middleware(request: Request<Body>, next: Next) -> Response {
    if is_same_origin(request.headers()) {
        return next.run(request).await;
    }

    (StatusCode::FORBIDDEN, "forbidden").into_response()
}

/// Whether the Referer header's authority matches the Host header.
fn is_same_origin(headers: &header::HeaderMap) -> bool {
    let check = || {
        let host = headers.get(header::HOST)?.to_str().ok()?;
        let referer: Uri = headers.get(header::REFERER)?.to_str().ok()?.parse().ok()?;
        Some(referer.authority()?.as_str() == host)
    };
    check().unwrap_or(false)
}

/// Validate BasicAuth credentials from request headers.
fn validate_basic_auth(headers: &header::HeaderMap, username: &str, password: &str) -> bool {
    let check = || {
        let hdr = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let decoded = base64_decode(hdr.strip_prefix("Basic ")?).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some(user == username && pass == password)
    };
    check().unwrap_or(false)
}

fn base64_decode(s: &str) -> Result<String, ()> {
    let bytes = STANDARD.decode(s).map_err(|_| ())?;
    String::from_utf8(bytes).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fields::{Field, Fields},
        handlers::Consts,
        sources::{Batches, Query, Source, Suggestion},
        suggest::MatchSpans,
    };
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use tower::ServiceExt;

    struct FakeRemote;

    #[async_trait]
    impl Source for FakeRemote {
        fn name(&self) -> &str {
            "fake"
        }

        async fn suggest(&self, query: &Query, out: &Batches) {
            let mut spans = MatchSpans::new();
            spans.append(&query.text, true);
            spans.append(" Ave", false);
            out.send(
                "From Google Maps",
                vec![Suggestion {
                    text: format!("{} Ave", query.text),
                    spans,
                    secondary_text: "New York, NY, USA".to_string(),
                }],
            );
        }
    }

    fn app(consts: Consts) -> Router {
        let mut fields = Fields::default();
        fields.insert(Field::from_values(
            "orig",
            &["Washington Square Park", "Union Square"],
        ));

        init_handlers(Arc::new(Ctx {
            fields,
            remote: Some(Arc::new(FakeRemote)),
            consts,
        }))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_autocomplete() {
        let resp = app(Consts::default())
            .oneshot(get("/api/autocomplete/orig/Squ?offset=3"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        let sections = v["data"].as_array().unwrap();
        assert_eq!(sections.len(), 2);

        let local = sections
            .iter()
            .find(|s| s["heading"] == "Miscellaneous")
            .unwrap();
        let suggestions = local["suggestions"].as_array().unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0]["text"], "Washington Square Park");
        assert_eq!(suggestions[0]["spans"][1]["text"], "Squ");
        assert_eq!(suggestions[0]["spans"][1]["is_match"], true);
        assert_eq!(suggestions[0]["secondary_text"], "");

        let remote = sections
            .iter()
            .find(|s| s["heading"] == "From Google Maps")
            .unwrap();
        assert_eq!(remote["suggestions"][0]["spans"][0]["text"], "Squ");
        assert_eq!(remote["suggestions"][0]["spans"][0]["is_match"], true);
    }

    #[tokio::test]
    async fn test_unknown_field() {
        let resp = app(Consts::default())
            .oneshot(get("/api/autocomplete/dest/union"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "unknown field: dest");
    }

    #[tokio::test]
    async fn test_empty_query() {
        let resp = app(Consts::default())
            .oneshot(get("/api/autocomplete/orig/"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], "query is required");
    }

    #[tokio::test]
    async fn test_referrer_check() {
        let consts = Consts {
            check_referrer: true,
            ..Default::default()
        };

        let resp = app(consts.clone())
            .oneshot(get("/api/autocomplete/orig/union"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let mut req = get("/api/autocomplete/orig/union");
        req.headers_mut()
            .insert(header::HOST, HeaderValue::from_static("example.com"));
        req.headers_mut().insert(
            header::REFERER,
            HeaderValue::from_static("https://example.com/?orig=x"),
        );
        let resp = app(consts.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let mut req = get("/api/autocomplete/orig/union");
        req.headers_mut()
            .insert(header::HOST, HeaderValue::from_static("example.com"));
        req.headers_mut().insert(
            header::REFERER,
            HeaderValue::from_static("https://evil.example/"),
        );
        let resp = app(consts).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_fields_and_reindex() {
        let consts = Consts {
            admin_username: "admin".to_string(),
            admin_password: "secret".to_string(),
            check_referrer: false,
        };

        let v = body_json(app(consts.clone()).oneshot(get("/api/fields")).await.unwrap()).await;
        assert_eq!(v["data"][0]["name"], "orig");
        assert_eq!(v["data"][0]["indexed"], false);

        let req = Request::builder()
            .method("POST")
            .uri("/api/fields/orig/reindex")
            .body(Body::empty())
            .unwrap();
        let resp = app(consts.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .method("POST")
            .uri("/api/fields/orig/reindex")
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("admin:secret")),
            )
            .body(Body::empty())
            .unwrap();
        let resp = app(consts).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["candidates"], 2);
    }
}
