//! Page visibility under a session's version and selections.

use std::collections::HashSet;

use super::chain::PageChain;
use super::model::{Category, FacetteId, FacetteSelection, Page, PageVisibility, Session, SessionVersion};
use crate::error::ChainError;

/// What visibility rules can see of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub version: SessionVersion,
    pub selected: HashSet<FacetteId>,
}

impl SessionView {
    pub fn new(session: &Session, selections: &[FacetteSelection]) -> Self {
        Self {
            version: session.valid_for.clone(),
            selected: selections.iter().map(|s| s.facette).collect(),
        }
    }
}

impl PageVisibility {
    pub fn allows(&self, view: &SessionView) -> bool {
        match self {
            Self::Always => true,
            Self::LatestOnly => view.version.is_latest(),
            Self::Versions { versions } => versions.iter().any(|v| v == view.version.tag()),
            Self::RequiresSelection { facette } => view.selected.contains(facette),
        }
    }
}

impl Page {
    /// Invalidated pages are never visible.
    pub fn is_visible(&self, view: &SessionView) -> bool {
        !self.is_invalidated && self.visibility.allows(view)
    }
}

/// Keep the pages visible to `view`, preserving order.
pub fn filter_visible(pages: &[Page], view: &SessionView) -> Vec<Page> {
    pages.iter().filter(|p| p.is_visible(view)).cloned().collect()
}

/// Top-level categories targeting each page, in page order.
///
/// A category targeted by several pages appears once per page.
pub fn collect_categories(pages: &[Page], categories: &[Category]) -> Vec<Category> {
    pages
        .iter()
        .filter_map(|page| {
            categories
                .iter()
                .find(|c| c.is_top_level() && c.target_page == Some(page.id))
                .cloned()
        })
        .collect()
}

/// First page after `page` that is visible to `view`.
///
/// `None` means no suitable page exists further down the chain.
pub fn next_visible_page(
    chain: &PageChain,
    page: &Page,
    view: &SessionView,
) -> Result<Option<Page>, ChainError> {
    Ok(chain
        .successors(page.id)?
        .into_iter()
        .find(|p| p.is_visible(view)))
}
