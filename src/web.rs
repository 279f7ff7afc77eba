//! Web front end for inventory lookups
//!
//! Thin shell around the lookup pipeline: an HTML form, a JSON endpoint and
//! static assets. Every request carries its own input; nothing is kept
//! between requests.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::{ErrorKind, PipelineError};
use crate::fetcher::JsonFetcher;
use crate::market::ItemPrice;
use crate::pipeline::{run_pipeline_with_fetcher, PipelineResult};

const PAGE_TEMPLATE: &str = include_str!("../templates/index.html");
const CONTENT_MARKER: &str = "<!-- content -->";

/// Shared application state: read-only configuration and one HTTP client
/// whose connection pool every request reuses
#[derive(Clone)]
struct AppState {
    config: Arc<PipelineConfig>,
    fetcher: JsonFetcher,
}

impl AppState {
    async fn lookup(&self, input: &str) -> Result<PipelineResult, PipelineError> {
        run_pipeline_with_fetcher(input, &self.config, &self.fetcher, &CancellationToken::new())
            .await
    }
}

/// Form posted by the lookup page
#[derive(Deserialize)]
struct LookupForm {
    data: String,
}

/// GET /api/inventory?id={input}
#[derive(Deserialize)]
struct LookupParams {
    id: String,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn error_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidIdentifier | ErrorKind::InventoryUnavailable => StatusCode::BAD_REQUEST,
        ErrorKind::Cancelled => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Minimal HTML escaping for text and attribute values
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(content: &str) -> String {
    PAGE_TEMPLATE.replace(CONTENT_MARKER, content)
}

fn render_error(kind: ErrorKind) -> String {
    format!(
        "<p class=\"error\">{}</p>",
        escape_html(kind.client_message())
    )
}

fn render_result(result: &PipelineResult) -> String {
    let mut html = format!(
        "<h2>Inventory of {}</h2>\n",
        escape_html(&result.resolved_id.to_string())
    );

    if result.entries.is_empty() {
        html.push_str("<p>This inventory is empty.</p>\n");
        return html;
    }

    if result.cancelled {
        html.push_str("<p class=\"error\">Lookup timed out, some prices are missing.</p>\n");
    }

    html.push_str("<table>\n<tr><th></th><th>Item</th><th>Type</th><th>Qty</th><th>Price</th></tr>\n");
    for entry in &result.entries {
        let price_class = match entry.price {
            ItemPrice::Unavailable => " class=\"price-unavailable\"",
            ItemPrice::Unmarketable => " class=\"price-unmarketable\"",
            _ => "",
        };
        html.push_str(&format!(
            "<tr><td><img src=\"{}\" alt=\"\"></td><td>{}</td><td>{}</td><td>{}</td><td{}>{}</td></tr>\n",
            escape_html(&entry.icon_full_url()),
            escape_html(&entry.market_name),
            escape_html(entry.item_type.as_deref().unwrap_or("")),
            entry.quantity,
            price_class,
            escape_html(&entry.price.to_string()),
        ));
    }
    html.push_str("</table>\n");
    html
}

/// GET / - lookup form
async fn index_handler() -> Html<String> {
    Html(render_page(""))
}

/// POST / - run a lookup and render the result
async fn lookup_handler(State(state): State<AppState>, Form(form): Form<LookupForm>) -> Response {
    let input = form.data.trim();
    match state.lookup(input).await {
        Ok(result) => Html(render_page(&render_result(&result))).into_response(),
        Err(e) => {
            log::warn!("Lookup for {:?} failed: {}", input, e);
            let kind = e.kind();
            (error_status(kind), Html(render_page(&render_error(kind)))).into_response()
        }
    }
}

/// GET /api/inventory?id={input}
async fn api_inventory_handler(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> (StatusCode, Json<ApiResponse<PipelineResult>>) {
    let input = params.id.trim();
    match state.lookup(input).await {
        Ok(result) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(result),
                error: None,
            }),
        ),
        Err(e) => {
            log::warn!("API lookup for {:?} failed: {}", input, e);
            api_error(&e)
        }
    }
}

fn api_error(e: &PipelineError) -> (StatusCode, Json<ApiResponse<PipelineResult>>) {
    let kind = e.kind();
    (
        error_status(kind),
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(kind.client_message().to_string()),
        }),
    )
}

/// Build the web server router
pub fn create_router(
    config: Arc<PipelineConfig>,
    fetcher: JsonFetcher,
    static_dir: &Path,
) -> Router {
    let state = AppState { config, fetcher };

    Router::new()
        .route("/", get(index_handler).post(lookup_handler))
        .route("/api/inventory", get(api_inventory_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
pub async fn serve(
    config: Arc<PipelineConfig>,
    static_dir: &Path,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = config.build_fetcher()?;
    let app = create_router(config, fetcher, static_dir);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
