use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

/// Open (or create) the pantry database at `path` and bring the schema up to
/// date. Parent directories are created on demand so a fresh install only
/// needs a writable home directory.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database at {}", path.display()))?;
    ensure_schema(&conn)?;
    debug!(path = %path.display(), "opened pantry database");
    Ok(conn)
}

/// Fresh schema in a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Run lazy migrations on a live connection. Foreign keys are switched on here
/// because SQLite leaves them off per connection, and the cascade from either
/// endpoint to `recipe_ingredients` depends on them.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ingredients (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            needed INTEGER NOT NULL DEFAULT 0,
            category TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create ingredients table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create recipes table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id TEXT NOT NULL,
            ingredient_id TEXT NOT NULL,
            PRIMARY KEY (recipe_id, ingredient_id),
            FOREIGN KEY(recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
            FOREIGN KEY(ingredient_id) REFERENCES ingredients(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create recipe_ingredients table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_ingredient
         ON recipe_ingredients(ingredient_id)",
        [],
    )
    .context("failed to create recipe_ingredients index")?;

    Ok(())
}
