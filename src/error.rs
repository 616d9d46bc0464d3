//! Error types for kuusi.

/// Top-level error type for the router.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl From<ChainError> for Error {
    fn from(e: ChainError) -> Self {
        Self::Route(RouteError::Chain(e))
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Request routing outcomes that end the request early.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("No page is available for this session")]
    NotAllowed,

    #[error("Malformed page chain: {0}")]
    Chain(#[from] ChainError),
}

impl RouteError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

/// Structural errors in the page chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("cycle detected at page {page_id}")]
    Cycle { page_id: i64 },

    #[error("page {from} links to missing page {to}")]
    DanglingLink { from: i64, to: i64 },

    #[error("page {page_id} is not part of the chain")]
    UnknownPage { page_id: i64 },
}

/// Template rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template {name} failed: {reason}")]
    Template { name: String, reason: String },
}

impl From<minijinja::Error> for RenderError {
    fn from(e: minijinja::Error) -> Self {
        Self::Template {
            name: e.name().unwrap_or("<unknown>").to_string(),
            reason: e.to_string(),
        }
    }
}
