//! Session resolution and cloning of answers between sessions.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Page, Session};
use crate::error::DatabaseError;
use crate::store::WizardStore;

/// What the router knows about the visitor before any session work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorContext {
    /// Session the visitor's cookie points at, if any.
    pub result_id: Option<Uuid>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Resolves, creates and clones visitor sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn WizardStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn WizardStore>) -> Self {
        Self { store }
    }

    /// Resolve the session for a request to `page`.
    ///
    /// Pages that do not require a session only reuse an existing one. Otherwise
    /// a missing, unknown or archived session is replaced by a fresh one, and the
    /// visitor context is pointed at the result.
    pub async fn resolve_session(
        &self,
        page: &Page,
        visitor: &mut VisitorContext,
    ) -> Result<Option<Session>, DatabaseError> {
        if !page.require_session {
            return match visitor.result_id {
                Some(id) => self.store.get_session(id).await,
                None => Ok(None),
            };
        }

        let session = match visitor.result_id {
            None => self.fresh_session(visitor).await?,
            Some(id) => match self.store.get_session(id).await? {
                None => {
                    debug!(result_id = %id, "Unknown session, starting a fresh one");
                    self.fresh_session(visitor).await?
                }
                Some(existing) if existing.is_old() => {
                    debug!(
                        result_id = %id,
                        valid_for = %existing.valid_for,
                        "Session belongs to an archived version, starting a fresh one"
                    );
                    self.fresh_session(visitor).await?
                }
                Some(existing) => existing,
            },
        };

        visitor.result_id = Some(session.result_id);
        Ok(Some(session))
    }

    /// Copy the answers of the session `old_id` into `session`.
    ///
    /// Returns the session that is active afterwards: `session` itself, or a new
    /// session when `session` was already cloned from a different result. An
    /// unknown `old_id` is ignored.
    pub async fn clone_selections(
        &self,
        old_id: &str,
        session: Session,
        visitor: &mut VisitorContext,
    ) -> Result<Session, DatabaseError> {
        let Some(old) = self.find_session(old_id).await? else {
            debug!(old_id, "No session to clone from");
            return Ok(session);
        };

        if old.result_id == session.result_id {
            debug!(result_id = %session.result_id, "Visitor opened their own result");
            return Ok(session);
        }

        debug!(old = %old.result_id, "Found old session");

        match session.session_origin {
            None => self.copy_from(&old, session).await,
            Some(origin) if origin != old.result_id => {
                debug!(
                    result_id = %session.result_id,
                    origin = %origin,
                    old = %old.result_id,
                    "Session already cloned from another result, starting a new one"
                );
                let fresh = Session::new(visitor.user_agent.clone(), visitor.referrer.clone())
                    .with_origin(old.result_id);
                self.store.insert_session(&fresh).await?;
                visitor.result_id = Some(fresh.result_id);
                self.copy_from(&old, fresh).await
            }
            Some(_) => {
                debug!(
                    result_id = %session.result_id,
                    old = %old.result_id,
                    "Skipping selection copy, session already linked"
                );
                Ok(session)
            }
        }
    }

    /// Store `language_code` on the session if it changed.
    pub async fn sync_language(
        &self,
        session: &mut Session,
        language_code: &str,
    ) -> Result<(), DatabaseError> {
        if session.language_code.as_deref() == Some(language_code) {
            return Ok(());
        }
        debug!(
            result_id = %session.result_id,
            from = ?session.language_code,
            to = language_code,
            "Session language changed"
        );
        session.language_code = Some(language_code.to_string());
        self.store.update_session(session).await
    }

    async fn fresh_session(&self, visitor: &VisitorContext) -> Result<Session, DatabaseError> {
        let session = Session::new(visitor.user_agent.clone(), visitor.referrer.clone());
        self.store.insert_session(&session).await?;
        info!(result_id = %session.result_id, "New session started");
        Ok(session)
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, DatabaseError> {
        match Uuid::parse_str(id) {
            Ok(id) => self.store.get_session(id).await,
            Err(_) => Ok(None),
        }
    }

    /// Copy missing answers, then pin `session` to `old`'s version and origin.
    async fn copy_from(&self, old: &Session, mut session: Session) -> Result<Session, DatabaseError> {
        let mut copied = 0usize;
        for selection in self.store.list_selections(old.result_id).await? {
            if self
                .store
                .insert_selection_if_absent(session.result_id, selection.facette, &selection.value)
                .await?
            {
                copied += 1;
            }
        }

        session.valid_for = old.valid_for.clone();
        session.session_origin = Some(old.result_id);
        self.store.update_session(&session).await?;

        info!(
            result_id = %session.result_id,
            origin = %old.result_id,
            copied,
            "Selections cloned"
        );
        Ok(session)
    }
}
