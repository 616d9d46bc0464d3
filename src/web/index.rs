//! Wizard page requests: resolves page, session and steps, then renders.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use tracing::debug;

use super::forward::{ForwardOutcome, Submission, SubmissionForwarder};
use super::render::{IndexContext, PageRenderer};
use crate::config::AppConfig;
use crate::error::{Error, RouteError};
use crate::store::WizardStore;
use crate::wizard::{
    PageChain, RequestContext, Session, SessionManager, SessionView, VisitorContext, build_steps,
    collect_categories, filter_visible, next_visible_page,
};

/// A wizard page request, stripped of HTTP types.
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
    /// Language segment of the path; the configured default when absent.
    pub language_code: Option<String>,
    /// Result id of a shared session whose answers should be loaded.
    pub shared_result: Option<String>,
    /// Catalogue id from `?page=`.
    pub page_key: Option<String>,
    /// Submitted form fields, present for POST requests.
    pub form: Option<HashMap<String, String>>,
    /// Request path and query.
    pub location: String,
    pub accepts_turbo: bool,
    pub visitor: VisitorContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBody {
    Page { status: StatusCode, html: String },
    Redirect { location: String },
}

#[derive(Debug, Clone)]
pub struct IndexResponse {
    pub body: IndexBody,
    /// Visitor state after the request; its session id goes into the cookie.
    pub visitor: VisitorContext,
}

/// Composes chain traversal, sessions, visibility and steps for one request.
pub struct WizardService {
    store: Arc<dyn WizardStore>,
    config: Arc<AppConfig>,
    sessions: SessionManager,
    renderer: Arc<dyn PageRenderer>,
    forwarder: Arc<dyn SubmissionForwarder>,
}

impl WizardService {
    pub fn new(
        store: Arc<dyn WizardStore>,
        config: Arc<AppConfig>,
        renderer: Arc<dyn PageRenderer>,
        forwarder: Arc<dyn SubmissionForwarder>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(Arc::clone(&store)),
            store,
            config,
            renderer,
            forwarder,
        }
    }

    pub fn store(&self) -> &dyn WizardStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn render_index(&self, request: IndexRequest) -> Result<IndexResponse, Error> {
        let language_code = request
            .language_code
            .clone()
            .unwrap_or_else(|| self.config.default_language_code.clone());
        if !self.config.language_codes.contains(&language_code) {
            return Err(RouteError::not_found("Language", language_code).into());
        }

        let page = match request.page_key.as_deref() {
            Some(key) => self
                .store
                .find_page(key)
                .await?
                .ok_or_else(|| RouteError::not_found("Page", key))?,
            None => self
                .store
                .first_page()
                .await?
                .ok_or_else(|| RouteError::not_found("Page", "<first>"))?,
        };

        let chain = PageChain::new(self.store.list_pages().await?);
        let route = chain.resolve_route(page.id)?;

        let mut visitor = request.visitor.clone();
        let (mut session, persisted) =
            match self.sessions.resolve_session(&page, &mut visitor).await? {
                Some(session) => (session, true),
                None => (
                    Session::new(visitor.user_agent.clone(), visitor.referrer.clone()),
                    false,
                ),
            };

        if let (Some(old_id), true) = (request.shared_result.as_deref(), persisted) {
            session = self
                .sessions
                .clone_selections(old_id, session, &mut visitor)
                .await?;
        }

        if persisted {
            self.sessions.sync_language(&mut session, &language_code).await?;
        } else {
            session.language_code = Some(language_code.clone());
        }

        let all_categories = self.store.list_categories().await?;
        let categories = collect_categories(&route.pages, &all_categories);

        let mut ctx =
            RequestContext::new(&language_code, request.shared_result.as_deref(), page.id);

        let mut overwrite_status = StatusCode::OK;
        if let Some(form) = &request.form {
            let outcome = self
                .forwarder
                .forward(Submission {
                    session: &session,
                    persisted,
                    page: &page,
                    chain: &chain,
                    base_url: &ctx.base_url,
                    form,
                })
                .await?;
            match outcome {
                ForwardOutcome {
                    status: None,
                    redirect: Some(location),
                } => {
                    debug!(location = %location, "Submission forwarded");
                    return Ok(IndexResponse {
                        body: IndexBody::Redirect { location },
                        visitor,
                    });
                }
                ForwardOutcome { status, .. } => {
                    if let Some(status) = status {
                        overwrite_status = status;
                    }
                }
            }
        }

        let selections = if persisted {
            self.store.list_selections(session.result_id).await?
        } else {
            Vec::new()
        };
        let view = SessionView::new(&session, &selections);
        let pages = filter_visible(&route.pages, &view);

        // Visitors on the start page are located at the first visible page.
        let current_location = if request.page_key.is_none() || request.location.len() <= 1 {
            let first = pages.first().ok_or(RouteError::NotAllowed)?;
            ctx.page_url(first)
        } else {
            request.location.clone()
        };

        let page = if page.is_visible(&view) {
            page
        } else {
            debug!(page = %page.catalogue_id, "Page hidden for this session, looking further");
            next_visible_page(&chain, &page, &view)?.ok_or(RouteError::NotAllowed)?
        };
        ctx.current_page = page.id;

        let steps = build_steps(&categories, &all_categories, &ctx, &chain);

        let context = IndexContext {
            title: self.config.name.clone(),
            page,
            steps,
            acceleration: self.config.acceleration,
            debug: self.config.debug,
            language_codes: self.config.language_codes.clone(),
            language_code: language_code.clone(),
            is_old: session.is_old(),
            locale_incomplete: self.config.is_locale_incomplete(&language_code),
            translation_url: self.config.translation_url.clone(),
            session,
            current_location,
            has_errors: ctx.has_errors,
            has_warnings: ctx.has_warnings,
        };
        let html = self.renderer.render_index(&context)?;

        let status = if request.accepts_turbo {
            debug!("This is a turbo call");
            overwrite_status
        } else {
            if overwrite_status != StatusCode::OK {
                debug!(
                    status = %overwrite_status,
                    "No turbo-stream accept header, revoking status change"
                );
            }
            StatusCode::OK
        };
        debug!(status = %status, "Status overwrite");

        Ok(IndexResponse {
            body: IndexBody::Page { status, html },
            visitor,
        })
    }
}
