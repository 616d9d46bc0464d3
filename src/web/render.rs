//! HTML rendering of the wizard page.

use minijinja::Environment;
use serde::Serialize;

use crate::error::RenderError;
use crate::wizard::{Page, Session, StepData};

const INDEX_TEMPLATE: &str = "index.html";

/// Everything the index template can see.
#[derive(Debug, Clone, Serialize)]
pub struct IndexContext {
    pub title: String,
    pub page: Page,
    pub steps: Vec<StepData>,
    pub acceleration: bool,
    pub debug: bool,
    pub language_codes: Vec<String>,
    pub language_code: String,
    pub session: Session,
    /// Session is pinned to an archived questionnaire version.
    pub is_old: bool,
    pub locale_incomplete: bool,
    pub translation_url: String,
    pub current_location: String,
    pub has_errors: bool,
    pub has_warnings: bool,
}

/// Turns an index context into HTML.
pub trait PageRenderer: Send + Sync {
    fn render_index(&self, context: &IndexContext) -> Result<String, RenderError>;
}

/// Renderer backed by the templates bundled into the binary.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../../templates/index.html"))?;
        Ok(Self { env })
    }
}

impl PageRenderer for MiniJinjaRenderer {
    fn render_index(&self, context: &IndexContext) -> Result<String, RenderError> {
        let template = self.env.get_template(INDEX_TEMPLATE)?;
        Ok(template.render(context)?)
    }
}
