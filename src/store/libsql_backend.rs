//! libSQL backend: async `WizardStore` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::WizardStore;
use crate::wizard::model::{
    Category, Choosable, ChoosableId, ChoosableMeta, FacetteId, FacetteSelection, Page,
    PageVisibility, Session, SessionVersion,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_pages(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Page>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut pages = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => pages.push(
                    row_to_page(&row)
                        .map_err(|e| DatabaseError::Query(format!("{op} row parse: {e}")))?,
                ),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("{op}: {e}"))),
            }
        }
        Ok(pages)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<i64>` to libsql Value.
fn opt_int(i: Option<i64>) -> libsql::Value {
    match i {
        Some(i) => libsql::Value::Integer(i),
        None => libsql::Value::Null,
    }
}

fn parse_uuid(s: &str, column: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s)
        .map_err(|e| DatabaseError::Serialization(format!("invalid {column} '{s}': {e}")))
}

/// Map a libsql Row to a Page.
///
/// Column order matches PAGE_COLUMNS.
fn row_to_page(row: &libsql::Row) -> Result<Page, libsql::Error> {
    let id: i64 = row.get(0)?;
    let visibility_str: String = row.get(6)?;
    let visibility: PageVisibility = serde_json::from_str(&visibility_str).unwrap_or_else(|e| {
        warn!(page_id = id, error = %e, "Unreadable page visibility, treating as always visible");
        PageVisibility::default()
    });

    Ok(Page {
        id,
        catalogue_id: row.get(1)?,
        title: row.get(2)?,
        href: row.get(3)?,
        previous_page: row.get::<i64>(4).ok(),
        next_page: row.get::<i64>(5).ok(),
        visibility,
        require_session: row.get::<i64>(7)? != 0,
        is_invalidated: row.get::<i64>(8)? != 0,
    })
}

/// Map a libsql Row to a Session.
///
/// Column order matches SESSION_COLUMNS.
fn row_to_session(row: &libsql::Row) -> Result<Session, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Query(format!("row_to_session: {e}"));

    let result_id_str: String = row.get(0).map_err(get_err)?;
    let valid_for: String = row.get(1).map_err(get_err)?;
    let origin_str: Option<String> = row.get(2).ok();
    let created_str: String = row.get(6).map_err(get_err)?;

    Ok(Session {
        result_id: parse_uuid(&result_id_str, "result_id")?,
        valid_for: SessionVersion::from(valid_for),
        session_origin: origin_str
            .map(|s| parse_uuid(&s, "session_origin"))
            .transpose()?,
        language_code: row.get(3).ok(),
        user_agent: row.get(4).ok(),
        referrer: row.get(5).ok(),
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_selection(row: &libsql::Row) -> Result<FacetteSelection, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Query(format!("row_to_selection: {e}"));
    let session_str: String = row.get(1).map_err(get_err)?;
    Ok(FacetteSelection {
        id: row.get(0).map_err(get_err)?,
        session: parse_uuid(&session_str, "session_id")?,
        facette: row.get(2).map_err(get_err)?,
        value: row.get(3).map_err(get_err)?,
    })
}

fn row_to_category(row: &libsql::Row) -> Result<Category, libsql::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        target_page: row.get::<i64>(3).ok(),
        child_of: row.get::<i64>(4).ok(),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const PAGE_COLUMNS: &str =
    "id, catalogue_id, title, href, previous_page, next_page, visibility, require_session, is_invalidated";

const SESSION_COLUMNS: &str =
    "result_id, valid_for, session_origin, language_code, user_agent, referrer, created_at";

#[async_trait]
impl WizardStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;
        migrations::run_migrations(self.conn()).await
    }

    // ── Pages ───────────────────────────────────────────────────────

    async fn save_page(&self, page: &Page) -> Result<(), DatabaseError> {
        let visibility = serde_json::to_string(&page.visibility)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO pages (id, catalogue_id, title, href, previous_page, next_page, visibility, require_session, is_invalidated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (id) DO UPDATE SET
                    catalogue_id = excluded.catalogue_id,
                    title = excluded.title,
                    href = excluded.href,
                    previous_page = excluded.previous_page,
                    next_page = excluded.next_page,
                    visibility = excluded.visibility,
                    require_session = excluded.require_session,
                    is_invalidated = excluded.is_invalidated",
                params![
                    page.id,
                    page.catalogue_id.as_str(),
                    page.title.as_str(),
                    page.href.as_str(),
                    opt_int(page.previous_page),
                    opt_int(page.next_page),
                    visibility,
                    page.require_session as i64,
                    page.is_invalidated as i64,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_page: {e}")))?;

        debug!(page_id = page.id, catalogue_id = %page.catalogue_id, "Page saved");
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<Page>, DatabaseError> {
        self.query_pages(
            "list_pages",
            &format!("SELECT {PAGE_COLUMNS} FROM pages ORDER BY id ASC"),
            (),
        )
        .await
    }

    async fn find_page(&self, catalogue_id: &str) -> Result<Option<Page>, DatabaseError> {
        let pages = self
            .query_pages(
                "find_page",
                &format!(
                    "SELECT {PAGE_COLUMNS} FROM pages WHERE catalogue_id = ?1 AND is_invalidated = 0 ORDER BY id ASC LIMIT 1"
                ),
                params![catalogue_id],
            )
            .await?;
        Ok(pages.into_iter().next())
    }

    async fn first_page(&self) -> Result<Option<Page>, DatabaseError> {
        let pages = self
            .query_pages(
                "first_page",
                &format!(
                    "SELECT {PAGE_COLUMNS} FROM pages WHERE is_invalidated = 0 ORDER BY id ASC LIMIT 1"
                ),
                (),
            )
            .await?;
        Ok(pages.into_iter().next())
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn insert_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let origin = session.session_origin.map(|id| id.to_string());
        self.conn()
            .execute(
                &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    session.result_id.to_string(),
                    session.valid_for.tag(),
                    opt_text(origin.as_deref()),
                    opt_text(session.language_code.as_deref()),
                    opt_text(session.user_agent.as_deref()),
                    opt_text(session.referrer.as_deref()),
                    session.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_session: {e}")))?;

        debug!(result_id = %session.result_id, valid_for = %session.valid_for, "Session inserted");
        Ok(())
    }

    async fn get_session(&self, result_id: Uuid) -> Result<Option<Session>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE result_id = ?1"),
                params![result_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_session(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session: {e}"))),
        }
    }

    async fn update_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let origin = session.session_origin.map(|id| id.to_string());
        let count = self
            .conn()
            .execute(
                "UPDATE sessions SET valid_for = ?1, session_origin = ?2, language_code = ?3 WHERE result_id = ?4",
                params![
                    session.valid_for.tag(),
                    opt_text(origin.as_deref()),
                    opt_text(session.language_code.as_deref()),
                    session.result_id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_session: {e}")))?;

        if count == 0 {
            return Err(DatabaseError::NotFound {
                entity: "session".into(),
                id: session.result_id.to_string(),
            });
        }
        debug!(result_id = %session.result_id, "Session updated");
        Ok(())
    }

    // ── Selections ──────────────────────────────────────────────────

    async fn list_selections(&self, session: Uuid) -> Result<Vec<FacetteSelection>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, session_id, facette_id, value FROM facette_selections WHERE session_id = ?1 ORDER BY id ASC",
                params![session.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_selections: {e}")))?;

        let mut selections = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => selections.push(row_to_selection(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_selections: {e}"))),
            }
        }
        Ok(selections)
    }

    async fn insert_selection_if_absent(
        &self,
        session: Uuid,
        facette: FacetteId,
        value: &str,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "INSERT INTO facette_selections (session_id, facette_id, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (session_id, facette_id) DO NOTHING",
                params![session.to_string(), facette, value],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_selection_if_absent: {e}")))?;
        Ok(count > 0)
    }

    async fn upsert_selection(
        &self,
        session: Uuid,
        facette: FacetteId,
        value: &str,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO facette_selections (session_id, facette_id, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (session_id, facette_id) DO UPDATE SET value = excluded.value",
                params![session.to_string(), facette, value],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_selection: {e}")))?;
        Ok(())
    }

    // ── Categories ──────────────────────────────────────────────────

    async fn save_category(&self, category: &Category) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO categories (id, name, icon, target_page, child_of) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    icon = excluded.icon,
                    target_page = excluded.target_page,
                    child_of = excluded.child_of",
                params![
                    category.id,
                    category.name.as_str(),
                    category.icon.as_str(),
                    opt_int(category.target_page),
                    opt_int(category.child_of),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_category: {e}")))?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, icon, target_page, child_of FROM categories ORDER BY id ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_categories: {e}")))?;

        let mut categories = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => categories.push(
                    row_to_category(&row)
                        .map_err(|e| DatabaseError::Query(format!("list_categories row parse: {e}")))?,
                ),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_categories: {e}"))),
            }
        }
        Ok(categories)
    }

    // ── Choosables ──────────────────────────────────────────────────

    async fn save_choosable(&self, choosable: &Choosable) -> Result<(), DatabaseError> {
        // Keys are stored upper-cased; collapse entries that differ only by case.
        let meta: BTreeMap<String, &str> = choosable
            .meta
            .values()
            .map(|m| (m.meta_key.to_uppercase(), m.meta_value.as_str()))
            .collect();

        let conn = self.conn();
        conn.execute(
            "INSERT INTO choosables (id, name, clicked) VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
            params![choosable.id, choosable.name.as_str(), choosable.clicked],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("save_choosable: {e}")))?;

        conn.execute(
            "DELETE FROM choosable_meta WHERE choosable_id = ?1",
            params![choosable.id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("save_choosable meta reset: {e}")))?;

        for (key, value) in &meta {
            conn.execute(
                "INSERT INTO choosable_meta (choosable_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
                params![choosable.id, key.as_str(), *value],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_choosable meta: {e}")))?;
        }

        debug!(choosable_id = choosable.id, meta = meta.len(), "Choosable saved");
        Ok(())
    }

    async fn get_choosable(&self, id: ChoosableId) -> Result<Option<Choosable>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT id, name, clicked FROM choosables WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_choosable: {e}")))?;

        let mut choosable = match rows.next().await {
            Ok(Some(row)) => Choosable {
                id: row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_choosable row parse: {e}")))?,
                name: row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("get_choosable row parse: {e}")))?,
                clicked: row.get(2).unwrap_or(0),
                meta: BTreeMap::new(),
            },
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("get_choosable: {e}"))),
        };

        let mut meta_rows = conn
            .query(
                "SELECT meta_key, meta_value FROM choosable_meta WHERE choosable_id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_choosable meta: {e}")))?;

        loop {
            match meta_rows.next().await {
                Ok(Some(row)) => {
                    let meta_key: String = row
                        .get(0)
                        .map_err(|e| DatabaseError::Query(format!("get_choosable meta parse: {e}")))?;
                    let meta_value: String = row
                        .get(1)
                        .map_err(|e| DatabaseError::Query(format!("get_choosable meta parse: {e}")))?;
                    choosable.meta.insert(
                        meta_key.clone(),
                        ChoosableMeta {
                            meta_key,
                            meta_value,
                        },
                    );
                }
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("get_choosable meta: {e}"))),
            }
        }

        Ok(Some(choosable))
    }

    async fn increment_clicks(&self, id: ChoosableId) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "UPDATE choosables SET clicked = clicked + 1 WHERE id = ?1 RETURNING clicked",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("increment_clicks: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("increment_clicks row parse: {e}"))),
            Ok(None) => Err(DatabaseError::NotFound {
                entity: "choosable".into(),
                id: id.to_string(),
            }),
            Err(e) => Err(DatabaseError::Query(format!("increment_clicks: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    // ── Page tests ──────────────────────────────────────────────────

    #[tokio::test]
    async fn save_and_list_pages() {
        let db = test_db().await;
        db.save_page(&Page::new(2, "second", "Second").with_links(Some(1), None))
            .await
            .unwrap();
        db.save_page(
            &Page::new(1, "first", "First")
                .with_links(None, Some(2))
                .with_visibility(PageVisibility::RequiresSelection { facette: 4 }),
        )
        .await
        .unwrap();

        let pages = db.list_pages().await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].catalogue_id, "first");
        assert_eq!(pages[0].next_page, Some(2));
        assert_eq!(pages[0].previous_page, None);
        assert_eq!(
            pages[0].visibility,
            PageVisibility::RequiresSelection { facette: 4 }
        );
        assert_eq!(pages[1].previous_page, Some(1));
    }

    #[tokio::test]
    async fn save_page_overwrites() {
        let db = test_db().await;
        db.save_page(&Page::new(1, "first", "First")).await.unwrap();
        db.save_page(&Page::new(1, "first", "Renamed")).await.unwrap();
        let pages = db.list_pages().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Renamed");
    }

    #[tokio::test]
    async fn find_page_skips_invalidated() {
        let db = test_db().await;
        let mut retired = Page::new(1, "welcome", "Old welcome");
        retired.is_invalidated = true;
        db.save_page(&retired).await.unwrap();
        assert!(db.find_page("welcome").await.unwrap().is_none());

        db.save_page(&Page::new(2, "welcome", "Welcome")).await.unwrap();
        assert_eq!(db.find_page("welcome").await.unwrap().unwrap().id, 2);
        assert_eq!(db.first_page().await.unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn first_page_empty_store() {
        let db = test_db().await;
        assert!(db.first_page().await.unwrap().is_none());
    }

    // ── Session tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn insert_and_get_session() {
        let db = test_db().await;
        let session = Session::new(Some("curl/8".into()), Some("https://example.org".into()));
        db.insert_session(&session).await.unwrap();

        let fetched = db.get_session(session.result_id).await.unwrap().unwrap();
        assert_eq!(fetched.result_id, session.result_id);
        assert_eq!(fetched.valid_for, SessionVersion::Latest);
        assert_eq!(fetched.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(fetched.referrer.as_deref(), Some("https://example.org"));
        assert!(fetched.session_origin.is_none());
    }

    #[tokio::test]
    async fn get_session_not_found() {
        let db = test_db().await;
        assert!(db.get_session(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_session_fields() {
        let db = test_db().await;
        let origin = Session::new(None, None);
        db.insert_session(&origin).await.unwrap();

        let mut session = Session::new(None, None);
        db.insert_session(&session).await.unwrap();
        session.valid_for = SessionVersion::Archived("v2".into());
        session.session_origin = Some(origin.result_id);
        session.language_code = Some("de".into());
        db.update_session(&session).await.unwrap();

        let fetched = db.get_session(session.result_id).await.unwrap().unwrap();
        assert_eq!(fetched.valid_for, SessionVersion::Archived("v2".into()));
        assert_eq!(fetched.session_origin, Some(origin.result_id));
        assert_eq!(fetched.language_code.as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn update_missing_session_fails() {
        let db = test_db().await;
        let err = db.update_session(&Session::new(None, None)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    // ── Selection tests ─────────────────────────────────────────────

    #[tokio::test]
    async fn selection_unique_per_facette() {
        let db = test_db().await;
        let session = Session::new(None, None);
        db.insert_session(&session).await.unwrap();

        assert!(db.insert_selection_if_absent(session.result_id, 1, "x").await.unwrap());
        assert!(!db.insert_selection_if_absent(session.result_id, 1, "y").await.unwrap());

        let selections = db.list_selections(session.result_id).await.unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].value, "x");
    }

    #[tokio::test]
    async fn upsert_overwrites_value() {
        let db = test_db().await;
        let session = Session::new(None, None);
        db.insert_session(&session).await.unwrap();

        db.upsert_selection(session.result_id, 3, "a").await.unwrap();
        db.upsert_selection(session.result_id, 3, "b").await.unwrap();
        let selections = db.list_selections(session.result_id).await.unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].value, "b");
    }

    #[tokio::test]
    async fn selection_requires_existing_session() {
        let db = test_db().await;
        assert!(db.upsert_selection(Uuid::new_v4(), 1, "x").await.is_err());
    }

    // ── Category tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn categories_listed_in_id_order() {
        let db = test_db().await;
        for (id, child_of) in [(3, Some(1)), (1, None), (2, None)] {
            db.save_category(&Category {
                id,
                name: format!("c{id}"),
                icon: "star".into(),
                target_page: Some(id),
                child_of,
            })
            .await
            .unwrap();
        }
        let categories = db.list_categories().await.unwrap();
        let ids: Vec<_> = categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(categories[2].child_of, Some(1));
        assert!(categories[0].is_top_level());
    }

    // ── Choosable tests ─────────────────────────────────────────────

    #[tokio::test]
    async fn choosable_with_meta() {
        let db = test_db().await;
        let choosable = Choosable::new(5, "Debian").with_meta("website", "https://debian.org");
        db.save_choosable(&choosable).await.unwrap();

        let fetched = db.get_choosable(5).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Debian");
        assert_eq!(fetched.clicked, 0);
        assert_eq!(fetched.meta["WEBSITE"].meta_value, "https://debian.org");
    }

    #[tokio::test]
    async fn meta_keys_differing_by_case_collapse() {
        let db = test_db().await;
        let mut choosable = Choosable::new(6, "Ubuntu").with_meta("wiki", "https://wiki.ubuntu.com");
        for key in ["Website", "WEBSITE"] {
            choosable.meta.insert(
                key.to_string(),
                ChoosableMeta {
                    meta_key: key.to_string(),
                    meta_value: "https://ubuntu.com".to_string(),
                },
            );
        }
        db.save_choosable(&choosable).await.unwrap();

        let fetched = db.get_choosable(6).await.unwrap().unwrap();
        assert_eq!(fetched.meta.len(), 2);
        assert_eq!(fetched.meta["WEBSITE"].meta_value, "https://ubuntu.com");
        assert_eq!(fetched.meta["WIKI"].meta_value, "https://wiki.ubuntu.com");
    }

    #[tokio::test]
    async fn increment_clicks_counts_each_call() {
        let db = test_db().await;
        db.save_choosable(&Choosable::new(1, "Arch")).await.unwrap();

        assert_eq!(db.increment_clicks(1).await.unwrap(), 1);
        assert_eq!(db.increment_clicks(1).await.unwrap(), 2);
        assert_eq!(db.get_choosable(1).await.unwrap().unwrap().clicked, 2);
    }

    #[tokio::test]
    async fn resaving_choosable_keeps_clicks() {
        let db = test_db().await;
        db.save_choosable(&Choosable::new(1, "Arch")).await.unwrap();
        db.increment_clicks(1).await.unwrap();
        db.save_choosable(&Choosable::new(1, "Arch Linux").with_meta("wiki", "https://wiki.archlinux.org"))
            .await
            .unwrap();

        let fetched = db.get_choosable(1).await.unwrap().unwrap();
        assert_eq!(fetched.clicked, 1);
        assert_eq!(fetched.name, "Arch Linux");
        assert!(fetched.meta.contains_key("WIKI"));
    }

    #[tokio::test]
    async fn increment_unknown_choosable() {
        let db = test_db().await;
        assert!(matches!(
            db.increment_clicks(99).await.unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn open_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("kuusi.db");
        let db = LibSqlBackend::new_local(&db_path).await.unwrap();
        db.save_page(&Page::new(1, "welcome", "Welcome")).await.unwrap();
        assert!(db_path.exists());
    }
}
