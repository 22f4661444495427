use axum::Router;

pub mod dashboard;
pub mod inventory;
pub mod products;
pub mod system;

/// Router for every endpoint that needs services and an actor context.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/inventory", inventory::router())
        .nest("/dashboard", dashboard::router())
}
