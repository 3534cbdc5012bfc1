//! Persistence module split across logical submodules. Every function takes a
//! plain `&Connection`, so the handlers can pass an open transaction instead.

mod connection;
mod ingredients;
pub mod links;
mod recipes;

pub use connection::{ensure_schema, open, open_in_memory};
pub use ingredients::{
    delete_ingredient, fetch_categories, fetch_ingredients, find_ingredient,
    find_ingredient_by_name, insert_ingredient, save_ingredient,
};
pub use recipes::{
    delete_recipe, fetch_recipes, find_recipe, insert_recipe, save_recipe, touch_recipe,
};
