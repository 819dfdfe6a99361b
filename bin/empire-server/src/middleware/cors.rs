use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the CORS layer from configuration.
///
/// Without `EMPIRE_CORS_ORIGINS` the layer is wildcard – suitable for
/// development; set a comma-separated origin list in production.
pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    if let Some(origins_str) = &state.config.cors_allowed_origins {
        let origins: Vec<axum::http::HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if !origins.is_empty() {
            return CorsLayer::new()
                .allow_origin(origins)
                .allow_headers(Any)
                .allow_methods(Any);
        }
    }
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
}
