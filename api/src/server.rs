//! Axum-based HTTP server.

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use souk_market::Marketplace;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;

/// Build the full router over one marketplace.
pub fn router(market: Marketplace) -> Router {
    Router::new()
        // Listings
        .route(
            "/api/listings",
            post(handlers::submit_listing).get(handlers::list_listings),
        )
        .route(
            "/api/listings/:id",
            get(handlers::get_listing).delete(handlers::delete_listing),
        )
        .route("/api/listings/:id/pull", post(handlers::withdraw_listing))
        // Purchase
        .route("/api/purchase", post(handlers::purchase))
        // Access
        .route("/api/auth/connect", post(handlers::connect))
        .route("/api/auth/tos", post(handlers::accept_tos))
        .route("/api/auth/tos/decline", post(handlers::decline_tos))
        // Reports
        .route("/api/reports", post(handlers::report_listing))
        // Admin
        .route("/api/admin/login", post(handlers::admin_login))
        .route("/api/admin/listings", get(handlers::admin_list_all))
        .route(
            "/api/admin/listings/:id/approve",
            post(handlers::admin_approve),
        )
        .route("/api/admin/listings/:id/reject", post(handlers::admin_reject))
        .route("/api/admin/listings/:id/risk", post(handlers::admin_set_risk))
        // Operations
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(market)
}

pub struct ApiServer {
    pub port: u16,
    pub market: Marketplace,
}

impl ApiServer {
    pub fn new(port: u16, market: Marketplace) -> Self {
        Self { port, market }
    }

    /// Bind and serve until the listener fails.
    pub async fn start(&self) -> std::io::Result<()> {
        let app = router(self.market.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "HTTP API listening");
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}
