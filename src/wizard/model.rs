//! Wizard data model: pages, sessions, selections, categories, choosables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PageId = i64;
pub type CategoryId = i64;
pub type FacetteId = i64;
pub type ChoosableId = i64;

/// Stored tag of sessions running against the current questionnaire.
const LATEST_TAG: &str = "latest";

/// Which questionnaire version a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionVersion {
    #[default]
    Latest,
    /// Frozen result of an earlier questionnaire version.
    Archived(String),
}

impl SessionVersion {
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// The tag stored in the database and matched by version-scoped pages.
    pub fn tag(&self) -> &str {
        match self {
            Self::Latest => LATEST_TAG,
            Self::Archived(version) => version,
        }
    }
}

impl From<String> for SessionVersion {
    fn from(s: String) -> Self {
        if s == LATEST_TAG {
            Self::Latest
        } else {
            Self::Archived(s)
        }
    }
}

impl From<SessionVersion> for String {
    fn from(v: SessionVersion) -> Self {
        v.tag().to_string()
    }
}

impl std::fmt::Display for SessionVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// When a page is shown to a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageVisibility {
    #[default]
    Always,
    LatestOnly,
    /// Shown to sessions whose version tag is listed (`"latest"` included).
    Versions { versions: Vec<String> },
    /// Shown once the session answered the given facette.
    RequiresSelection { facette: FacetteId },
}

/// One screen of the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    /// Public key used in `?page=`.
    pub catalogue_id: String,
    pub title: String,
    /// Link suffix relative to the language base URL, e.g. `?page=welcome`.
    pub href: String,
    #[serde(default)]
    pub previous_page: Option<PageId>,
    #[serde(default)]
    pub next_page: Option<PageId>,
    #[serde(default)]
    pub visibility: PageVisibility,
    #[serde(default = "default_true")]
    pub require_session: bool,
    #[serde(default)]
    pub is_invalidated: bool,
}

fn default_true() -> bool {
    true
}

impl Page {
    /// Create a page linked to nothing, visible to everyone.
    pub fn new(id: PageId, catalogue_id: &str, title: &str) -> Self {
        Self {
            id,
            catalogue_id: catalogue_id.to_string(),
            title: title.to_string(),
            href: format!("?page={catalogue_id}"),
            previous_page: None,
            next_page: None,
            visibility: PageVisibility::Always,
            require_session: true,
            is_invalidated: false,
        }
    }

    pub fn with_links(mut self, previous: Option<PageId>, next: Option<PageId>) -> Self {
        self.previous_page = previous;
        self.next_page = next;
        self
    }

    pub fn with_visibility(mut self, visibility: PageVisibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// A visitor's questionnaire run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub result_id: Uuid,
    pub valid_for: SessionVersion,
    /// Session this one was cloned from.
    pub session_origin: Option<Uuid>,
    pub language_code: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session on the latest questionnaire version.
    pub fn new(user_agent: Option<String>, referrer: Option<String>) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            valid_for: SessionVersion::Latest,
            session_origin: None,
            language_code: None,
            user_agent,
            referrer,
            created_at: Utc::now(),
        }
    }

    pub fn with_origin(mut self, origin: Uuid) -> Self {
        self.session_origin = Some(origin);
        self
    }

    /// Whether the session is pinned to an archived questionnaire version.
    pub fn is_old(&self) -> bool {
        !self.valid_for.is_latest()
    }
}

/// A recorded answer. Unique per (session, facette).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetteSelection {
    pub id: i64,
    pub session: Uuid,
    pub facette: FacetteId,
    pub value: String,
}

/// Navigation grouping of pages; nests at most one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub target_page: Option<PageId>,
    #[serde(default)]
    pub child_of: Option<CategoryId>,
}

impl Category {
    pub fn is_top_level(&self) -> bool {
        self.child_of.is_none()
    }
}

/// A selectable option with outbound links keyed by property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choosable {
    pub id: ChoosableId,
    pub name: String,
    #[serde(default)]
    pub clicked: i64,
    /// Upper-cased property name → metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, ChoosableMeta>,
}

impl Choosable {
    pub fn new(id: ChoosableId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            clicked: 0,
            meta: BTreeMap::new(),
        }
    }

    /// Attach a metadata value; the key is normalized to upper case.
    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        let key = key.to_uppercase();
        self.meta.insert(
            key.clone(),
            ChoosableMeta {
                meta_key: key,
                meta_value: value.to_string(),
            },
        );
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoosableMeta {
    pub meta_key: String,
    pub meta_value: String,
}
