use std::time::Instant;

use axum::{
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::context::ActorContext;

pub const ACTOR_HEADER: &str = "x-actor";

/// Attach an [`ActorContext`] from the `x-actor` header and log the request.
pub async fn actor_middleware(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let actor = extract_actor(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(actor.clone());

    let started = Instant::now();
    let res = next.run(req).await;

    tracing::info!(
        %method,
        path = %path,
        status = res.status().as_u16(),
        actor = actor.actor(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    res
}

fn extract_actor(headers: &HeaderMap) -> ActorContext {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ActorContext::new)
        .unwrap_or_default()
}
