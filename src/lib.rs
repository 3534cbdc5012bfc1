//! Core library surface for the Pantry Manager.
//!
//! The handlers in [`api`] are the whole contract: ingredients with a
//! shopping-list flag, recipes, and the many-to-many link between them, all
//! stored in one SQLite file. The terminal UI in [`ui`] is one client of that
//! contract.
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ui;

/// Configuration and logging bootstrap used by `main.rs`.
pub use config::{init_logging, Config};

pub use error::{Entity, PantryError, PantryResult};

pub use models::{
    Ingredient, IngredientUpdate, NewIngredient, NewRecipe, Recipe, RecipeUpdate,
    RecipeWithIngredients,
};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
