//! kuusi: a questionnaire wizard that walks visitors through linked pages.

pub mod config;
pub mod error;
pub mod store;
pub mod web;
pub mod wizard;
