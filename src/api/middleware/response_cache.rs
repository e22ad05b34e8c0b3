//! Response cache middleware
//!
//! Applied with `route_layer` so the matched route pattern is available.
//! Routes without a registered template pass straight through. For routes
//! with one, the key is resolved from the path parameters (named, and in
//! order as positional arguments) and the query string:
//!
//! - writes (`POST`, `PUT`, `PATCH`, `DELETE`) invalidate the key's group
//!   before the handler runs
//! - `GET` is answered from L1 or L2 when possible; otherwise a `200`
//!   JSON response is stored in both tiers on the way out
//!
//! Hits carry the canonical JSON body; a miss keeps the handler's own body.
//! Both get an `x-cache` header of `HIT:L1`, `HIT:L2` or `MISS`. Failing to
//! buffer a body never turns the handler's response into an error.

use axum::{
    body::{to_bytes, Body, Bytes, HttpBody},
    extract::{MatchedPath, RawPathParams, State},
    http::{header, request::Parts, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use futures::stream;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::domain::cache::canonical_json;
use crate::domain::{Provenance, RequestContext, ResolvedKey, PROVENANCE_HEADER};
use crate::infrastructure::observability::{record_cache_lookup, record_populate_skipped};

pub async fn response_cache_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(route) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
    else {
        return next.run(request).await;
    };

    let Some(template) = state.operations.template_for(request.method(), &route) else {
        return next.run(request).await;
    };

    let (mut parts, body) = request.into_parts();
    let ctx = request_context(&mut parts).await;
    let request = Request::from_parts(parts, body);

    let Some(resolved) = state.cache.resolve(template, &ctx) else {
        return next.run(request).await;
    };

    if ctx.is_write() {
        state.cache.invalidate(&resolved.group).await;
        return next.run(request).await;
    }

    if !ctx.is_read() {
        return next.run(request).await;
    }

    if let Some(hit) = cached_response(&state, &resolved).await {
        return hit;
    }

    let flight = state.cache.begin_flight(&resolved.key).await;

    if flight.is_some() {
        if let Some(hit) = cached_response(&state, &resolved).await {
            return hit;
        }
    }

    let response = next.run(request).await;
    let response = store_response(&state, &resolved, response).await;

    drop(flight);
    response
}

/// Builds the key context from the method, path parameters and query string
pub(crate) async fn request_context(parts: &mut Parts) -> RequestContext {
    let mut ctx = RequestContext::new(parts.method.clone())
        .with_query(parts.uri.query().unwrap_or_default());

    if let Ok(params) = parts.extract::<RawPathParams>().await {
        for (name, value) in &params {
            ctx = ctx
                .with_param(name, value.to_string())
                .with_arg(value.to_string());
        }
    }

    ctx
}

async fn cached_response(state: &AppState, resolved: &ResolvedKey) -> Option<Response> {
    let (value, provenance) = state.cache.lookup(resolved).await?;
    record_cache_lookup(provenance);

    Some(json_response(StatusCode::OK, &value, provenance))
}

async fn store_response(state: &AppState, resolved: &ResolvedKey, response: Response) -> Response {
    if response.status() != StatusCode::OK {
        record_populate_skipped("status");
        return response;
    }

    if !is_json(&response) {
        record_populate_skipped("not_json");
        return response;
    }

    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= state.max_body_bytes as u64);

    if !fits {
        debug!(key = %resolved.key, "Response body too large or unsized, skipping cache");
        record_populate_skipped("too_large");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %resolved.key, error = %e, "Failed to buffer response body");
            record_populate_skipped("buffer_failed");
            let replay = stream::once(async move { Err::<Bytes, _>(e) });
            return Response::from_parts(parts, Body::from_stream(replay));
        }
    };

    if bytes.len() > state.max_body_bytes {
        debug!(key = %resolved.key, "Response body exceeded its size hint, skipping cache");
        record_populate_skipped("too_large");
        return Response::from_parts(parts, Body::from(bytes));
    }

    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(key = %resolved.key, error = %e, "Response body is not valid JSON, skipping cache");
            record_populate_skipped("not_json");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    state.cache.populate(resolved, &value).await;
    record_cache_lookup(Provenance::Miss);
    debug!(key = %resolved.key, "Cache miss, stored response");

    parts.headers.insert(
        PROVENANCE_HEADER,
        HeaderValue::from_static(Provenance::Miss.as_str()),
    );

    Response::from_parts(parts, Body::from(bytes))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn json_response(status: StatusCode, value: &Value, provenance: Provenance) -> Response {
    (
        status,
        [
            ("content-type", "application/json"),
            (PROVENANCE_HEADER, provenance.as_str()),
        ],
        canonical_json(value),
    )
        .into_response()
}
