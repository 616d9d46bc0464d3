//! HTTP surface of the wizard.

pub mod forward;
pub mod index;
pub mod render;
pub mod visitor;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

pub use forward::{ForwardOutcome, SelectionForwarder, Submission, SubmissionForwarder};
pub use index::{IndexBody, IndexRequest, IndexResponse, WizardService};
pub use render::{IndexContext, MiniJinjaRenderer, PageRenderer};

use crate::error::{Error, RouteError};
use crate::wizard::route_outgoing;

/// Shared state for wizard routes.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WizardService>,
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

/// Build the wizard routes.
pub fn wizard_routes(service: Arc<WizardService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/out/{id}/{property}", get(outgoing))
        .route("/{language_code}", get(index).post(submit))
        .route("/{language_code}/{id}", get(shared_index).post(shared_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "kuusi",
    }))
}

/// GET / sends visitors to the default language.
async fn root(State(state): State<AppState>) -> Redirect {
    Redirect::to(&format!("/{}", state.service.config().default_language_code))
}

/// GET /out/{id}/{property}
async fn outgoing(
    State(state): State<AppState>,
    Path((id, property)): Path<(String, String)>,
) -> Result<Redirect, Error> {
    let id = id
        .parse()
        .map_err(|_| RouteError::not_found("Choosable", id.clone()))?;
    let target = route_outgoing(state.service.store(), id, &property).await?;
    Ok(Redirect::to(&target))
}

async fn index(
    State(state): State<AppState>,
    Path(language_code): Path<String>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, Error> {
    handle(&state, language_code, None, query, uri, &headers, None).await
}

async fn submit(
    State(state): State<AppState>,
    Path(language_code): Path<String>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, Error> {
    handle(&state, language_code, None, query, uri, &headers, Some(form)).await
}

async fn shared_index(
    State(state): State<AppState>,
    Path((language_code, id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, Error> {
    handle(&state, language_code, Some(id), query, uri, &headers, None).await
}

async fn shared_submit(
    State(state): State<AppState>,
    Path((language_code, id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, Error> {
    handle(&state, language_code, Some(id), query, uri, &headers, Some(form)).await
}

async fn handle(
    state: &AppState,
    language_code: String,
    shared_result: Option<String>,
    query: PageQuery,
    uri: axum::http::Uri,
    headers: &HeaderMap,
    form: Option<HashMap<String, String>>,
) -> Result<Response, Error> {
    let visitor = visitor::visitor_from_headers(headers);
    let known_session = visitor.result_id;

    let request = IndexRequest {
        language_code: Some(language_code),
        shared_result,
        page_key: query.page,
        form,
        location: uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        accepts_turbo: visitor::accepts_turbo(headers),
        visitor,
    };
    let response = state.service.render_index(request).await?;
    Ok(into_http(known_session, response))
}

fn into_http(known_session: Option<Uuid>, response: IndexResponse) -> Response {
    let mut http = match response.body {
        IndexBody::Page { status, html } => (status, Html(html)).into_response(),
        IndexBody::Redirect { location } => Redirect::to(&location).into_response(),
    };
    if let Some(result_id) = response.visitor.result_id {
        if known_session != Some(result_id) {
            http.headers_mut()
                .insert(SET_COOKIE, visitor::session_cookie(result_id));
        }
    }
    http
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Route(RouteError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Route(RouteError::NotAllowed) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
            (status, "Internal server error").into_response()
        } else {
            warn!(error = %self, status = %status, "Request rejected");
            (status, self.to_string()).into_response()
        }
    }
}
