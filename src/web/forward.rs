//! Form submission handling for POSTed wizard pages.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use tracing::debug;

use crate::error::Error;
use crate::store::WizardStore;
use crate::wizard::{Page, PageChain, Session, SessionView, next_visible_page};

/// Form field prefix carrying an answer: `facette_<id>=<value>`.
const FACETTE_FIELD_PREFIX: &str = "facette_";

/// A POSTed page, as seen by the forwarder.
pub struct Submission<'a> {
    pub session: &'a Session,
    /// Whether `session` exists in the store (transient sessions cannot hold answers).
    pub persisted: bool,
    pub page: &'a Page,
    pub chain: &'a PageChain,
    pub base_url: &'a str,
    pub form: &'a HashMap<String, String>,
}

/// What the router should do after a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardOutcome {
    /// Status for the rendered page; only honoured for turbo requests.
    pub status: Option<StatusCode>,
    /// Location to redirect to instead of rendering, when no status is set.
    pub redirect: Option<String>,
}

/// Processes submitted answers and decides where the visitor goes next.
#[async_trait]
pub trait SubmissionForwarder: Send + Sync {
    async fn forward(&self, submission: Submission<'_>) -> Result<ForwardOutcome, Error>;
}

/// Stores submitted answers and redirects to the next visible page.
pub struct SelectionForwarder {
    store: Arc<dyn WizardStore>,
}

impl SelectionForwarder {
    pub fn new(store: Arc<dyn WizardStore>) -> Self {
        Self { store }
    }
}

/// Parse `facette_<id>` fields into (facette, value) pairs.
fn parse_answers(form: &HashMap<String, String>) -> Vec<(i64, &str)> {
    let mut answers: Vec<_> = form
        .iter()
        .filter_map(|(key, value)| {
            let id = key.strip_prefix(FACETTE_FIELD_PREFIX)?.parse().ok()?;
            Some((id, value.as_str()))
        })
        .collect();
    answers.sort_by_key(|(id, _)| *id);
    answers
}

#[async_trait]
impl SubmissionForwarder for SelectionForwarder {
    async fn forward(&self, submission: Submission<'_>) -> Result<ForwardOutcome, Error> {
        let answers = parse_answers(submission.form);
        if answers.is_empty() {
            debug!(page = %submission.page.catalogue_id, "Submission without answers");
            return Ok(ForwardOutcome {
                status: Some(StatusCode::UNPROCESSABLE_ENTITY),
                redirect: None,
            });
        }

        let session_id = submission.session.result_id;
        let selections = if submission.persisted {
            for (facette, value) in &answers {
                self.store.upsert_selection(session_id, *facette, value).await?;
            }
            debug!(result_id = %session_id, answers = answers.len(), "Answers stored");
            self.store.list_selections(session_id).await?
        } else {
            Vec::new()
        };

        let view = SessionView::new(submission.session, &selections);
        let next = next_visible_page(submission.chain, submission.page, &view)?;
        Ok(ForwardOutcome {
            status: None,
            redirect: next.map(|page| format!("{}{}", submission.base_url, page.href)),
        })
    }
}
