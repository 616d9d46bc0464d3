//! Step navigation built from the category hierarchy.
//!
//! Each top-level category becomes a major step; its children become the
//! minor steps nested below it.

use serde::Serialize;

use super::chain::PageChain;
use super::context::RequestContext;
use super::model::Category;

/// One renderable navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub name: String,
    pub icon: String,
    /// Link to the category's target page, if it has one in the chain.
    pub href: Option<String>,
    pub is_last: bool,
    pub is_active: bool,
}

/// A major step with its minor steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepData {
    pub icon: String,
    pub major: Step,
    pub minor: Vec<Step>,
}

impl Category {
    pub fn to_step(&self, ctx: &RequestContext, chain: &PageChain, is_last: bool) -> Step {
        let target = self.target_page.and_then(|id| chain.get(id));
        Step {
            name: self.name.clone(),
            icon: self.icon.clone(),
            href: target.map(|page| ctx.page_url(page)),
            is_last,
            is_active: self.target_page == Some(ctx.current_page),
        }
    }
}

/// Build the step list for `categories`, in input order.
///
/// `all_categories` is searched for children of each entry.
pub fn build_steps(
    categories: &[Category],
    all_categories: &[Category],
    ctx: &RequestContext,
    chain: &PageChain,
) -> Vec<StepData> {
    let last = categories.len().saturating_sub(1);
    categories
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let minor = all_categories
                .iter()
                .filter(|child| child.child_of == Some(category.id))
                .map(|child| child.to_step(ctx, chain, false))
                .collect();
            StepData {
                icon: category.icon.clone(),
                major: category.to_step(ctx, chain, index == last),
                minor,
            }
        })
        .collect()
}
