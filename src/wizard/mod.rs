//! Wizard core: page chain, sessions, visibility and step navigation.
//!
//! Everything here works on plain data loaded from a `WizardStore`; the HTTP
//! layer in `crate::web` only translates requests into these calls.

pub mod chain;
pub mod context;
pub mod model;
pub mod outgoing;
pub mod session;
pub mod steps;
pub mod visibility;

pub use chain::{PageChain, Route};
pub use context::RequestContext;
pub use model::{
    Category, Choosable, ChoosableMeta, FacetteSelection, Page, PageVisibility, Session,
    SessionVersion,
};
pub use outgoing::route_outgoing;
pub use session::{SessionManager, VisitorContext};
pub use steps::{Step, StepData, build_steps};
pub use visibility::{SessionView, collect_categories, filter_visible, next_visible_page};
