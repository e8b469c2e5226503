//! Terminal front-end for the query and refresh operations.

pub mod countries;
pub mod refresh;
pub mod setup;
pub mod status;
pub mod ui;
