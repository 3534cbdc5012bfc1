use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, instrument, warn};

use crate::db::{self, links};
use crate::error::{PantryError, PantryResult};
use crate::models::{Ingredient, NewRecipe, Recipe, RecipeUpdate, RecipeWithIngredients};

use super::{new_id, next_timestamp};

/// Attach the recipe's current ingredient set.
fn with_ingredients(conn: &Connection, recipe: Recipe) -> PantryResult<RecipeWithIngredients> {
    let ingredients = links::ingredients_for_recipe(conn, &recipe.id)?;
    Ok(RecipeWithIngredients {
        recipe,
        ingredients,
    })
}

fn require_recipe(conn: &Connection, id: &str) -> PantryResult<Recipe> {
    db::find_recipe(conn, id)?.ok_or_else(|| {
        warn!(recipe_id = id, "unknown recipe");
        PantryError::recipe_not_found(id)
    })
}

#[instrument(skip(conn))]
pub fn list_recipes(conn: &mut Connection) -> PantryResult<Vec<RecipeWithIngredients>> {
    let tx = conn.transaction()?;
    let recipes = db::fetch_recipes(&tx)?
        .into_iter()
        .map(|recipe| with_ingredients(&tx, recipe))
        .collect::<PantryResult<Vec<_>>>()?;
    tx.commit()?;
    debug!(count = recipes.len(), "listed recipes");
    Ok(recipes)
}

#[instrument(skip(conn))]
pub fn create_recipe(conn: &mut Connection, input: NewRecipe) -> PantryResult<RecipeWithIngredients> {
    let now = next_timestamp(None);
    let recipe = Recipe {
        id: new_id(),
        name: input.name,
        notes: input.notes,
        tags: input.tags,
        created_at: now,
        updated_at: now,
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    db::insert_recipe(&tx, &recipe)?;
    tx.commit()?;

    info!(recipe_id = %recipe.id, name = %recipe.name, "created recipe");
    Ok(RecipeWithIngredients {
        recipe,
        ingredients: Vec::new(),
    })
}

#[instrument(skip(conn))]
pub fn get_recipe(conn: &mut Connection, id: &str) -> PantryResult<RecipeWithIngredients> {
    let tx = conn.transaction()?;
    let recipe = require_recipe(&tx, id)?;
    let view = with_ingredients(&tx, recipe)?;
    tx.commit()?;
    Ok(view)
}

/// Apply the fields present in `changes` and refresh `updated_at`.
#[instrument(skip(conn))]
pub fn update_recipe(
    conn: &mut Connection,
    id: &str,
    changes: RecipeUpdate,
) -> PantryResult<RecipeWithIngredients> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut recipe = require_recipe(&tx, id)?;

    if let Some(name) = changes.name {
        recipe.name = name;
    }
    if let Some(notes) = changes.notes {
        recipe.notes = notes;
    }
    if let Some(tags) = changes.tags {
        recipe.tags = tags;
    }
    recipe.updated_at = next_timestamp(Some(recipe.updated_at));

    db::save_recipe(&tx, &recipe)?;
    let view = with_ingredients(&tx, recipe)?;
    tx.commit()?;

    info!(recipe_id = id, "updated recipe");
    Ok(view)
}

/// Delete a recipe together with its links. The ingredients stay.
#[instrument(skip(conn))]
pub fn delete_recipe(conn: &mut Connection, id: &str) -> PantryResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let linked = links::ingredients_for_recipe(&tx, id)?.len();
    if !db::delete_recipe(&tx, id)? {
        warn!(recipe_id = id, "delete for unknown recipe");
        return Err(PantryError::recipe_not_found(id));
    }
    tx.commit()?;

    info!(recipe_id = id, removed_links = linked, "deleted recipe");
    Ok(())
}

/// Link an ingredient to a recipe. Both ids must resolve. Linking a pair that
/// is already linked changes nothing, including the recipe's `updated_at`.
#[instrument(skip(conn))]
pub fn link_ingredient(
    conn: &mut Connection,
    recipe_id: &str,
    ingredient_id: &str,
) -> PantryResult<RecipeWithIngredients> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut recipe = require_recipe(&tx, recipe_id)?;
    if db::find_ingredient(&tx, ingredient_id)?.is_none() {
        warn!(recipe_id, ingredient_id, "link to unknown ingredient");
        return Err(PantryError::ingredient_not_found(ingredient_id));
    }

    if links::add_edge(&tx, recipe_id, ingredient_id)? {
        recipe.updated_at = next_timestamp(Some(recipe.updated_at));
        db::touch_recipe(&tx, recipe_id, recipe.updated_at)?;
        info!(recipe_id, ingredient_id, "linked ingredient");
    } else {
        debug!(recipe_id, ingredient_id, "ingredient already linked");
    }

    let view = with_ingredients(&tx, recipe)?;
    tx.commit()?;
    Ok(view)
}

/// Unlink an ingredient from a recipe. The recipe must exist, but an
/// ingredient id that is unknown or not linked is treated as nothing to
/// remove.
#[instrument(skip(conn))]
pub fn unlink_ingredient(
    conn: &mut Connection,
    recipe_id: &str,
    ingredient_id: &str,
) -> PantryResult<RecipeWithIngredients> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut recipe = require_recipe(&tx, recipe_id)?;

    if links::remove_edge(&tx, recipe_id, ingredient_id)? {
        recipe.updated_at = next_timestamp(Some(recipe.updated_at));
        db::touch_recipe(&tx, recipe_id, recipe.updated_at)?;
        info!(recipe_id, ingredient_id, "unlinked ingredient");
    } else {
        debug!(recipe_id, ingredient_id, "nothing to unlink");
    }

    let view = with_ingredients(&tx, recipe)?;
    tx.commit()?;
    Ok(view)
}

/// Ingredients that could still be linked to the recipe.
#[instrument(skip(conn))]
pub fn available_ingredients(conn: &mut Connection, recipe_id: &str) -> PantryResult<Vec<Ingredient>> {
    let tx = conn.transaction()?;
    require_recipe(&tx, recipe_id)?;
    let ingredients = links::ingredients_not_in_recipe(&tx, recipe_id)?;
    tx.commit()?;
    Ok(ingredients)
}
