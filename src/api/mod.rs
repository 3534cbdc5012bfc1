//! Request handlers for ingredients, recipes and the link between them.
//!
//! Each handler receives the storage handle explicitly, runs inside exactly one
//! SQLite transaction and either commits everything or nothing. Handlers never
//! call each other. An HTTP layer in front of them would answer `201` for the
//! create calls, `204` for the deletes and `200` otherwise, and map errors with
//! [`PantryError::status_code`](crate::error::PantryError::status_code).

mod ingredients;
mod recipes;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub use ingredients::{
    create_ingredient, delete_ingredient, get_ingredient, list_categories, list_ingredients,
    update_ingredient,
};
pub use recipes::{
    available_ingredients, create_recipe, delete_recipe, get_recipe, link_ingredient,
    list_recipes, unlink_ingredient, update_recipe,
};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Ingredient names and categories are compared and stored lowercase.
fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Timestamp for a write. Never earlier than one microsecond past `previous`,
/// so `updated_at` moves forward even when two writes land on the same tick.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if now <= previous => previous + Duration::microseconds(1),
        _ => now,
    }
}
