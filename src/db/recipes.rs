use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::PantryResult;
use crate::models::Recipe;

const RECIPE_COLUMNS: &str = "id, name, notes, tags, created_at, updated_at";

fn map_recipe(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        name: row.get(1)?,
        notes: row.get(2)?,
        tags: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Every recipe, ordered case-insensitively so mixed-case names group together.
pub fn fetch_recipes(conn: &Connection) -> PantryResult<Vec<Recipe>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY name COLLATE NOCASE, created_at"
    ))?;

    let recipes = stmt
        .query_map([], map_recipe)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(recipes)
}

pub fn find_recipe(conn: &Connection, id: &str) -> PantryResult<Option<Recipe>> {
    let recipe = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
            params![id],
            map_recipe,
        )
        .optional()?;
    Ok(recipe)
}

pub fn insert_recipe(conn: &Connection, recipe: &Recipe) -> PantryResult<()> {
    conn.execute(
        "INSERT INTO recipes (id, name, notes, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            recipe.id,
            recipe.name,
            recipe.notes,
            recipe.tags,
            recipe.created_at,
            recipe.updated_at
        ],
    )?;
    Ok(())
}

/// Write the mutable columns back. `created_at` is never rewritten.
pub fn save_recipe(conn: &Connection, recipe: &Recipe) -> PantryResult<bool> {
    let updated = conn.execute(
        "UPDATE recipes SET name = ?1, notes = ?2, tags = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            recipe.name,
            recipe.notes,
            recipe.tags,
            recipe.updated_at,
            recipe.id
        ],
    )?;
    Ok(updated > 0)
}

/// Bump only `updated_at`, used when the ingredient set changes.
pub fn touch_recipe(conn: &Connection, id: &str, updated_at: DateTime<Utc>) -> PantryResult<bool> {
    let updated = conn.execute(
        "UPDATE recipes SET updated_at = ?1 WHERE id = ?2",
        params![updated_at, id],
    )?;
    Ok(updated > 0)
}

/// Remove a recipe row; `recipe_ingredients` cascades.
pub fn delete_recipe(conn: &Connection, id: &str) -> PantryResult<bool> {
    let deleted = conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::open_in_memory;

    fn recipe(id: &str, name: &str) -> Recipe {
        let now = Utc::now();
        Recipe {
            id: id.to_string(),
            name: name.to_string(),
            notes: String::new(),
            tags: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn listing_ignores_name_case() {
        let conn = open_in_memory().unwrap();
        insert_recipe(&conn, &recipe("1", "waffles")).unwrap();
        insert_recipe(&conn, &recipe("2", "Pancakes")).unwrap();
        insert_recipe(&conn, &recipe("3", "omelette")).unwrap();

        let names: Vec<String> = fetch_recipes(&conn)
            .unwrap()
            .into_iter()
            .map(|recipe| recipe.name)
            .collect();
        assert_eq!(names, vec!["omelette", "Pancakes", "waffles"]);
    }

    #[test]
    fn save_keeps_created_at() {
        let conn = open_in_memory().unwrap();
        let original = recipe("1", "Soup");
        insert_recipe(&conn, &original).unwrap();

        let mut changed = original.clone();
        changed.created_at = original.created_at + Duration::days(3);
        changed.updated_at = original.updated_at + Duration::seconds(1);
        changed.notes = "simmer".to_string();
        assert!(save_recipe(&conn, &changed).unwrap());

        let loaded = find_recipe(&conn, "1").unwrap().unwrap();
        assert_eq!(loaded.created_at, original.created_at);
        assert_eq!(loaded.updated_at, changed.updated_at);
        assert_eq!(loaded.notes, "simmer");
    }

    #[test]
    fn touch_only_moves_updated_at() {
        let conn = open_in_memory().unwrap();
        let original = recipe("1", "Soup");
        insert_recipe(&conn, &original).unwrap();

        let later = original.updated_at + Duration::minutes(5);
        assert!(touch_recipe(&conn, "1", later).unwrap());
        assert!(!touch_recipe(&conn, "missing", later).unwrap());

        let loaded = find_recipe(&conn, "1").unwrap().unwrap();
        assert_eq!(loaded.name, "Soup");
        assert_eq!(loaded.updated_at, later);
    }
}
