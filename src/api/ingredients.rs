use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, instrument, warn};

use crate::db::{self, links};
use crate::error::{PantryError, PantryResult};
use crate::models::{Ingredient, IngredientUpdate, NewIngredient};

use super::{fold_case, new_id, next_timestamp};

#[instrument(skip(conn))]
pub fn list_ingredients(conn: &mut Connection) -> PantryResult<Vec<Ingredient>> {
    let tx = conn.transaction()?;
    let ingredients = db::fetch_ingredients(&tx)?;
    tx.commit()?;
    debug!(count = ingredients.len(), "listed ingredients");
    Ok(ingredients)
}

/// Create an ingredient after case-folding its name and category. The lookup
/// and insert share an immediate transaction, so two concurrent creates of
/// the same name cannot both pass the check.
#[instrument(skip(conn))]
pub fn create_ingredient(conn: &mut Connection, input: NewIngredient) -> PantryResult<Ingredient> {
    let name = fold_case(&input.name);
    let category = fold_case(&input.category);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if db::find_ingredient_by_name(&tx, &name)?.is_some() {
        warn!(%name, "ingredient name already taken");
        return Err(PantryError::DuplicateName(name));
    }

    let ingredient = Ingredient {
        id: new_id(),
        name,
        needed: input.needed,
        category,
        updated_at: next_timestamp(None),
    };
    db::insert_ingredient(&tx, &ingredient)?;
    tx.commit()?;

    info!(ingredient_id = %ingredient.id, name = %ingredient.name, "created ingredient");
    Ok(ingredient)
}

#[instrument(skip(conn))]
pub fn get_ingredient(conn: &mut Connection, id: &str) -> PantryResult<Ingredient> {
    let tx = conn.transaction()?;
    let ingredient = db::find_ingredient(&tx, id)?;
    tx.commit()?;
    ingredient.ok_or_else(|| {
        debug!(ingredient_id = id, "ingredient lookup missed");
        PantryError::ingredient_not_found(id)
    })
}

/// Apply the fields present in `changes` and refresh `updated_at`. A rename is
/// checked against the other ingredients' names the same way a create is;
/// renaming to the current name is allowed.
#[instrument(skip(conn))]
pub fn update_ingredient(
    conn: &mut Connection,
    id: &str,
    changes: IngredientUpdate,
) -> PantryResult<Ingredient> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut ingredient = db::find_ingredient(&tx, id)?.ok_or_else(|| {
        warn!(ingredient_id = id, "update for unknown ingredient");
        PantryError::ingredient_not_found(id)
    })?;

    if let Some(name) = changes.name {
        let name = fold_case(&name);
        if let Some(existing) = db::find_ingredient_by_name(&tx, &name)? {
            if existing.id != ingredient.id {
                warn!(ingredient_id = id, %name, "rename collides with another ingredient");
                return Err(PantryError::DuplicateName(name));
            }
        }
        ingredient.name = name;
    }
    if let Some(needed) = changes.needed {
        ingredient.needed = needed;
    }
    if let Some(category) = changes.category {
        ingredient.category = fold_case(&category);
    }
    ingredient.updated_at = next_timestamp(Some(ingredient.updated_at));

    db::save_ingredient(&tx, &ingredient)?;
    tx.commit()?;

    info!(ingredient_id = %ingredient.id, "updated ingredient");
    Ok(ingredient)
}

/// Delete an ingredient. Its links to recipes go with it; the recipes
/// themselves stay untouched.
#[instrument(skip(conn))]
pub fn delete_ingredient(conn: &mut Connection, id: &str) -> PantryResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let linked_recipes = links::recipes_for_ingredient(&tx, id)?.len();
    if !db::delete_ingredient(&tx, id)? {
        warn!(ingredient_id = id, "delete for unknown ingredient");
        return Err(PantryError::ingredient_not_found(id));
    }
    tx.commit()?;

    info!(ingredient_id = id, linked_recipes, "deleted ingredient");
    Ok(())
}

/// Distinct categories currently in use.
#[instrument(skip(conn))]
pub fn list_categories(conn: &mut Connection) -> PantryResult<Vec<String>> {
    let tx = conn.transaction()?;
    let categories = db::fetch_categories(&tx)?;
    tx.commit()?;
    Ok(categories)
}
