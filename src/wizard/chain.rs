//! Page chain: indexed doubly linked list of wizard pages.
//!
//! Links are page ids resolved through a map, so a malformed chain is
//! reported as a `ChainError` instead of being followed forever.

use std::collections::{HashMap, HashSet};

use super::model::{Page, PageId};
use crate::error::ChainError;

/// The ordered pages reachable from a start page.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Page following the start page, if any.
    pub next_page: Option<Page>,
    /// Every page of the chain in link order.
    pub pages: Vec<Page>,
}

/// All pages, addressable by id.
#[derive(Debug, Clone, Default)]
pub struct PageChain {
    pages: HashMap<PageId, Page>,
}

impl PageChain {
    pub fn new(pages: impl IntoIterator<Item = Page>) -> Self {
        Self {
            pages: pages.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    /// Resolve the full chain around `start`: predecessors, start, successors.
    pub fn resolve_route(&self, start: PageId) -> Result<Route, ChainError> {
        let start_page = self
            .get(start)
            .ok_or(ChainError::UnknownPage { page_id: start })?;

        let mut visited = HashSet::from([start]);

        let mut before = Vec::new();
        let mut cursor = start_page;
        while let Some(prev_id) = cursor.previous_page {
            cursor = self.follow(cursor.id, prev_id, &mut visited)?;
            before.push(cursor.clone());
        }
        before.reverse();

        let mut pages = before;
        pages.push(start_page.clone());

        let successors = self.walk_forward(start_page, &mut visited)?;
        let next_page = successors.first().cloned();
        pages.extend(successors);

        Ok(Route { next_page, pages })
    }

    /// Pages after `start` in link order, `start` excluded.
    pub fn successors(&self, start: PageId) -> Result<Vec<Page>, ChainError> {
        let start_page = self
            .get(start)
            .ok_or(ChainError::UnknownPage { page_id: start })?;
        let mut visited = HashSet::from([start]);
        self.walk_forward(start_page, &mut visited)
    }

    fn walk_forward(
        &self,
        start: &Page,
        visited: &mut HashSet<PageId>,
    ) -> Result<Vec<Page>, ChainError> {
        let mut after = Vec::new();
        let mut cursor = start;
        while let Some(next_id) = cursor.next_page {
            cursor = self.follow(cursor.id, next_id, visited)?;
            after.push(cursor.clone());
        }
        Ok(after)
    }

    fn follow(
        &self,
        from: PageId,
        to: PageId,
        visited: &mut HashSet<PageId>,
    ) -> Result<&Page, ChainError> {
        if !visited.insert(to) {
            return Err(ChainError::Cycle { page_id: to });
        }
        self.get(to).ok_or(ChainError::DanglingLink { from, to })
    }
}
