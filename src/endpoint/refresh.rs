//! Stateless listing refresh: resolve, query, render, rewrite, respond.
//!
//! The core handler is synchronous and host-driven; the axum route is a
//! thin adapter that decodes the transport and serializes the envelope.

use crate::host::catalog::CatalogHost;
use crate::host::context::{AmbientLoop, LoopContext};
use crate::host::criteria::ResultPage;
use crate::host::hooks::ExtensionPoints;
use crate::listing::dispatcher::RequestState;
use crate::listing::pagination::rewrite_markup;
use crate::listing::renderer::render_listing;
use crate::query::builder::build_spec;
use crate::query::injection::fresh_criteria;
use crate::request::raw::RawRequest;
use crate::request::resolver::ParamResolver;
use axum::extract::{RawQuery, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// The one hard failure the endpoint reports.
pub const DEPENDENCY_MESSAGE: &str = "Storefront rendering is unavailable.";

/// Route the endpoint serves under.
pub const REFRESH_PATH: &str = "/gm2-search/refresh";

/// Payload of a successful refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshData {
    pub content: String,
    pub pagination: String,
    pub max_pages: u32,
}

/// Outcome of one refresh request.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed(RefreshData),
    Failed { message: String },
}

impl RefreshOutcome {
    /// The fixed `{success, data}` envelope callers consume.
    pub fn into_envelope(self) -> Value {
        match self {
            Self::Refreshed(data) => json!({
                "success": true,
                "data": {
                    "content": data.content,
                    "pagination": data.pagination,
                    "max_pages": data.max_pages,
                },
            }),
            Self::Failed { message } => json!({
                "success": false,
                "data": { "message": message },
            }),
        }
    }
}

/// Handle one refresh request against the host.
///
/// Malformed parameters degrade inside the resolver; a failing host
/// query degrades to an empty listing. Only a missing rendering
/// dependency produces the failure envelope.
pub fn handle_refresh(
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
    ambient: &AmbientLoop,
    raw: &RawRequest,
) -> RefreshOutcome {
    if !host.commerce_active() {
        return RefreshOutcome::Failed {
            message: DEPENDENCY_MESSAGE.to_string(),
        };
    }

    let resolver = ParamResolver::new(raw);
    let state = RequestState::new();
    let spec = state.spec(|| build_spec(&resolver, host, hooks)).clone();
    let criteria = fresh_criteria(&spec, host, hooks);

    let results = match host.execute(&criteria) {
        Ok(results) => results,
        Err(err) => {
            warn!(%err, "refresh query failed, returning empty listing");
            ResultPage::empty(criteria.page, criteria.per_page)
        }
    };

    let scope_ctx = LoopContext {
        total: results.total,
        total_pages: results.total_pages,
        current_page: results.page,
        per_page: results.per_page,
        is_search_refresh: true,
    };
    let _scope = ambient.enter(scope_ctx);

    let content = render_listing(&results, &spec, host, &state);
    let pagination = rewrite_markup(&host.render_pagination(results.page, results.total_pages), &spec);

    RefreshOutcome::Refreshed(RefreshData {
        content,
        pagination,
        max_pages: results.total_pages,
    })
}

/// Shared state behind the axum route.
#[derive(Clone)]
pub struct EndpointState {
    pub host: Arc<dyn CatalogHost>,
    pub hooks: Arc<ExtensionPoints>,
    pub ambient: Arc<AmbientLoop>,
}

/// Router serving the refresh endpoint. Intentionally open: the
/// endpoint is public and side-effect free, so CORS is permissive and
/// there is no authentication.
pub fn router(state: EndpointState) -> Router {
    Router::new()
        .route(REFRESH_PATH, post(refresh_route).get(refresh_route))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn refresh_route(
    State(state): State<EndpointState>,
    RawQuery(query): RawQuery,
    body: String,
) -> Json<Value> {
    let request_id = Uuid::new_v4();
    debug!(%request_id, body_bytes = body.len(), "refresh request");

    let raw = RawRequest::from_parts(
        query.as_deref().unwrap_or(""),
        (!body.is_empty()).then_some(body.as_str()),
    );

    let outcome = tokio::task::spawn_blocking(move || {
        handle_refresh(&*state.host, &state.hooks, &state.ambient, &raw)
    })
    .await
    .unwrap_or_else(|err| {
        error!(%request_id, %err, "refresh task panicked");
        RefreshOutcome::Failed {
            message: "Refresh failed.".to_string(),
        }
    });

    Json(outcome.into_envelope())
}
