//! Request-scoped routing state passed explicitly through the wizard.

use uuid::Uuid;

use super::model::{Page, PageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub language_code: String,
    /// `/{language_code}`, plus `/{id}` when the visitor opened a shared result
    /// whose id is a well-formed UUID.
    pub base_url: String,
    /// Page being rendered.
    pub current_page: PageId,
    pub has_errors: bool,
    pub has_warnings: bool,
}

impl RequestContext {
    pub fn new(language_code: &str, shared_result: Option<&str>, current_page: PageId) -> Self {
        let shared = shared_result.and_then(|id| Uuid::parse_str(id).ok());
        let base_url = match shared {
            Some(id) => format!("/{language_code}/{id}"),
            None => format!("/{language_code}"),
        };
        Self {
            language_code: language_code.to_string(),
            base_url,
            current_page,
            has_errors: false,
            has_warnings: false,
        }
    }

    /// Absolute link to `page` under this request's base URL.
    pub fn page_url(&self, page: &Page) -> String {
        format!("{}{}", self.base_url, page.href)
    }
}
