//! The recipe/ingredient association as a plain set of `(recipe_id,
//! ingredient_id)` pairs. The composite primary key keeps each pair unique and
//! the foreign keys drop pairs whenever either endpoint row goes away.

use rusqlite::{params, Connection};

use crate::error::PantryResult;
use crate::models::Ingredient;

use super::ingredients::map_ingredient;

/// Insert the pair unless it is already present. `INSERT OR IGNORE` makes the
/// call idempotent; the return value tells whether an edge was created.
pub fn add_edge(conn: &Connection, recipe_id: &str, ingredient_id: &str) -> PantryResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO recipe_ingredients (recipe_id, ingredient_id) VALUES (?1, ?2)",
        params![recipe_id, ingredient_id],
    )?;
    Ok(inserted > 0)
}

/// Remove the pair if present. Returns whether an edge was removed.
pub fn remove_edge(conn: &Connection, recipe_id: &str, ingredient_id: &str) -> PantryResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM recipe_ingredients WHERE recipe_id = ?1 AND ingredient_id = ?2",
        params![recipe_id, ingredient_id],
    )?;
    Ok(deleted > 0)
}

/// Membership test for a single pair. The handlers rely on the row counts
/// from `add_edge`/`remove_edge` instead; this is the read-only lookup for
/// callers outside a write.
pub fn edge_exists(conn: &Connection, recipe_id: &str, ingredient_id: &str) -> PantryResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM recipe_ingredients WHERE recipe_id = ?1 AND ingredient_id = ?2
         )",
        params![recipe_id, ingredient_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Ingredients linked to one recipe, sorted by name.
pub fn ingredients_for_recipe(conn: &Connection, recipe_id: &str) -> PantryResult<Vec<Ingredient>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.name, i.needed, i.category, i.updated_at
         FROM ingredients i
         INNER JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
         WHERE ri.recipe_id = ?1
         ORDER BY i.name",
    )?;

    let ingredients = stmt
        .query_map([recipe_id], map_ingredient)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ingredients)
}

/// Ingredients not yet linked to the recipe, for the picker in the detail view.
pub fn ingredients_not_in_recipe(
    conn: &Connection,
    recipe_id: &str,
) -> PantryResult<Vec<Ingredient>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.name, i.needed, i.category, i.updated_at
         FROM ingredients i
         WHERE NOT EXISTS (
             SELECT 1 FROM recipe_ingredients ri
             WHERE ri.ingredient_id = i.id AND ri.recipe_id = ?1
         )
         ORDER BY i.name",
    )?;

    let ingredients = stmt
        .query_map([recipe_id], map_ingredient)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ingredients)
}

/// Ids of the recipes an ingredient belongs to.
pub fn recipes_for_ingredient(conn: &Connection, ingredient_id: &str) -> PantryResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT recipe_id FROM recipe_ingredients WHERE ingredient_id = ?1 ORDER BY recipe_id",
    )?;

    let ids = stmt
        .query_map([ingredient_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(ids)
}

/// Total number of edges across all recipes.
pub fn edge_count(conn: &Connection) -> PantryResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipe_ingredients", [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{insert_ingredient, insert_recipe, open_in_memory};
    use crate::models::Recipe;

    fn seed(conn: &Connection) {
        let now = Utc::now();
        for (id, name) in [("i1", "milk"), ("i2", "eggs"), ("i3", "flour")] {
            insert_ingredient(
                conn,
                &Ingredient {
                    id: id.to_string(),
                    name: name.to_string(),
                    needed: false,
                    category: String::new(),
                    updated_at: now,
                },
            )
            .unwrap();
        }
        insert_recipe(
            conn,
            &Recipe {
                id: "r1".to_string(),
                name: "Pancakes".to_string(),
                notes: String::new(),
                tags: String::new(),
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    #[test]
    fn add_edge_is_idempotent() {
        let conn = open_in_memory().unwrap();
        seed(&conn);

        assert!(add_edge(&conn, "r1", "i1").unwrap());
        assert!(!add_edge(&conn, "r1", "i1").unwrap());
        assert_eq!(edge_count(&conn).unwrap(), 1);
        assert!(edge_exists(&conn, "r1", "i1").unwrap());
    }

    #[test]
    fn remove_edge_reports_absent_pairs() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        add_edge(&conn, "r1", "i2").unwrap();

        assert!(remove_edge(&conn, "r1", "i2").unwrap());
        assert!(!remove_edge(&conn, "r1", "i2").unwrap());
        assert!(!remove_edge(&conn, "r1", "nope").unwrap());
        assert_eq!(edge_count(&conn).unwrap(), 0);
    }

    #[test]
    fn dangling_endpoints_are_rejected() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        assert!(add_edge(&conn, "r1", "missing").is_err());
    }

    #[test]
    fn linked_and_unlinked_views_partition_ingredients() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        add_edge(&conn, "r1", "i1").unwrap();
        add_edge(&conn, "r1", "i3").unwrap();

        let linked: Vec<String> = ingredients_for_recipe(&conn, "r1")
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        let available: Vec<String> = ingredients_not_in_recipe(&conn, "r1")
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();

        assert_eq!(linked, vec!["flour", "milk"]);
        assert_eq!(available, vec!["eggs"]);
        assert_eq!(recipes_for_ingredient(&conn, "i1").unwrap(), vec!["r1"]);
    }
}
