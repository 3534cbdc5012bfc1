//! Ratatui front end: a pantry tab, a recipes tab and a per-recipe view, all
//! driven through the handlers in [`crate::api`].

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
