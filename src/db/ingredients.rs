use rusqlite::{ffi, params, Connection, Error as SqlError, OptionalExtension, Row};

use crate::error::{PantryError, PantryResult};
use crate::models::Ingredient;

const INGREDIENT_COLUMNS: &str = "id, name, needed, category, updated_at";

pub(crate) fn map_ingredient(row: &Row<'_>) -> rusqlite::Result<Ingredient> {
    Ok(Ingredient {
        id: row.get(0)?,
        name: row.get(1)?,
        needed: row.get(2)?,
        category: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Every ingredient, sorted by name so list views stay stable between reloads.
pub fn fetch_ingredients(conn: &Connection) -> PantryResult<Vec<Ingredient>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INGREDIENT_COLUMNS} FROM ingredients ORDER BY name"
    ))?;

    let ingredients = stmt
        .query_map([], map_ingredient)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ingredients)
}

pub fn find_ingredient(conn: &Connection, id: &str) -> PantryResult<Option<Ingredient>> {
    let ingredient = conn
        .query_row(
            &format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?1"),
            params![id],
            map_ingredient,
        )
        .optional()?;
    Ok(ingredient)
}

/// Exact match on the stored name. Callers pass the already case-folded name.
pub fn find_ingredient_by_name(conn: &Connection, name: &str) -> PantryResult<Option<Ingredient>> {
    let ingredient = conn
        .query_row(
            &format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE name = ?1"),
            params![name],
            map_ingredient,
        )
        .optional()?;
    Ok(ingredient)
}

pub fn insert_ingredient(conn: &Connection, ingredient: &Ingredient) -> PantryResult<()> {
    conn.execute(
        "INSERT INTO ingredients (id, name, needed, category, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            ingredient.id,
            ingredient.name,
            ingredient.needed,
            ingredient.category,
            ingredient.updated_at
        ],
    )
    .map_err(|err| map_unique_constraint(err, &ingredient.name))?;
    Ok(())
}

/// Write every mutable column back. Returns `false` when the id matched no row.
pub fn save_ingredient(conn: &Connection, ingredient: &Ingredient) -> PantryResult<bool> {
    let updated = conn
        .execute(
            "UPDATE ingredients SET name = ?1, needed = ?2, category = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                ingredient.name,
                ingredient.needed,
                ingredient.category,
                ingredient.updated_at,
                ingredient.id
            ],
        )
        .map_err(|err| map_unique_constraint(err, &ingredient.name))?;
    Ok(updated > 0)
}

/// Remove an ingredient row. The schema cascades to `recipe_ingredients`, so
/// the edges disappear in the same statement.
pub fn delete_ingredient(conn: &Connection, id: &str) -> PantryResult<bool> {
    let deleted = conn.execute("DELETE FROM ingredients WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Distinct non-empty categories for the autocomplete in the ingredient form.
pub fn fetch_categories(conn: &Connection) -> PantryResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT category FROM ingredients
         WHERE category <> ''
         ORDER BY category",
    )?;

    let categories = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(categories)
}

/// The name index is the last line of defence against duplicates slipping in
/// between the lookup and the insert. Only a UNIQUE violation maps to
/// `DuplicateName`; primary-key and other constraint failures stay storage
/// errors.
fn map_unique_constraint(err: SqlError, name: &str) -> PantryError {
    let unique_violation = matches!(
        &err,
        SqlError::SqliteFailure(failure, _) if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    );
    if unique_violation {
        PantryError::DuplicateName(name.to_string())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::open_in_memory;

    fn ingredient(id: &str, name: &str, category: &str) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: name.to_string(),
            needed: false,
            category: category.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unique_index_maps_to_duplicate_name() {
        let conn = open_in_memory().unwrap();
        insert_ingredient(&conn, &ingredient("a", "milk", "dairy")).unwrap();

        let err = insert_ingredient(&conn, &ingredient("b", "milk", "")).unwrap_err();
        assert!(matches!(err, PantryError::DuplicateName(ref name) if name == "milk"));
    }

    #[test]
    fn primary_key_clash_stays_a_storage_error() {
        let conn = open_in_memory().unwrap();
        insert_ingredient(&conn, &ingredient("a", "milk", "dairy")).unwrap();

        let err = insert_ingredient(&conn, &ingredient("a", "eggs", "")).unwrap_err();
        assert!(matches!(err, PantryError::Storage(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn timestamps_survive_a_round_trip() {
        let conn = open_in_memory().unwrap();
        let original = ingredient("a", "eggs", "");
        insert_ingredient(&conn, &original).unwrap();

        let loaded = find_ingredient(&conn, "a").unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn categories_are_distinct_and_skip_blank() {
        let conn = open_in_memory().unwrap();
        insert_ingredient(&conn, &ingredient("a", "milk", "dairy")).unwrap();
        insert_ingredient(&conn, &ingredient("b", "butter", "dairy")).unwrap();
        insert_ingredient(&conn, &ingredient("c", "flour", "baking")).unwrap();
        insert_ingredient(&conn, &ingredient("d", "salt", "")).unwrap();

        assert_eq!(fetch_categories(&conn).unwrap(), vec!["baking", "dairy"]);
    }

    #[test]
    fn save_reports_missing_rows() {
        let conn = open_in_memory().unwrap();
        assert!(!save_ingredient(&conn, &ingredient("ghost", "x", "")).unwrap());
        assert!(!delete_ingredient(&conn, "ghost").unwrap());
    }
}
