//! `WizardStore` trait: single async interface for all persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::wizard::model::{
    Category, Choosable, ChoosableId, FacetteId, FacetteSelection, Page, Session,
};

/// Backend-agnostic store for pages, sessions, selections, categories and choosables.
#[async_trait]
pub trait WizardStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Pages ───────────────────────────────────────────────────────

    /// Insert or replace a page by id.
    async fn save_page(&self, page: &Page) -> Result<(), DatabaseError>;

    /// All pages, invalidated ones included, in id order.
    async fn list_pages(&self) -> Result<Vec<Page>, DatabaseError>;

    /// A non-invalidated page by its catalogue id.
    async fn find_page(&self, catalogue_id: &str) -> Result<Option<Page>, DatabaseError>;

    /// The non-invalidated page with the lowest id.
    async fn first_page(&self) -> Result<Option<Page>, DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    async fn insert_session(&self, session: &Session) -> Result<(), DatabaseError>;

    async fn get_session(&self, result_id: Uuid) -> Result<Option<Session>, DatabaseError>;

    /// Persist version, origin and language of an existing session.
    async fn update_session(&self, session: &Session) -> Result<(), DatabaseError>;

    // ── Selections ──────────────────────────────────────────────────

    async fn list_selections(&self, session: Uuid) -> Result<Vec<FacetteSelection>, DatabaseError>;

    /// Insert a selection unless the session already answered `facette`.
    /// Returns whether a row was inserted.
    async fn insert_selection_if_absent(
        &self,
        session: Uuid,
        facette: FacetteId,
        value: &str,
    ) -> Result<bool, DatabaseError>;

    /// Insert a selection or overwrite the existing answer for `facette`.
    async fn upsert_selection(
        &self,
        session: Uuid,
        facette: FacetteId,
        value: &str,
    ) -> Result<(), DatabaseError>;

    // ── Categories ──────────────────────────────────────────────────

    async fn save_category(&self, category: &Category) -> Result<(), DatabaseError>;

    /// All categories in id order.
    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError>;

    // ── Choosables ──────────────────────────────────────────────────

    /// Insert or update a choosable and its metadata. An existing click count is kept.
    async fn save_choosable(&self, choosable: &Choosable) -> Result<(), DatabaseError>;

    async fn get_choosable(&self, id: ChoosableId) -> Result<Option<Choosable>, DatabaseError>;

    /// Atomically add one click. Returns the new count.
    async fn increment_clicks(&self, id: ChoosableId) -> Result<i64, DatabaseError>;
}
