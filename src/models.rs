//! Domain models that mirror the SQLite schema and get passed between the
//! handlers and the terminal UI. The entity structs stay light-weight data
//! holders; the `New*` and `*Update` structs describe what a caller may supply
//! when creating or patching a row.

use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A pantry item. Names are unique once case-folded, so `"Milk"` and `"milk"`
/// can never both exist.
pub struct Ingredient {
    /// Server-generated UUID, never changes after creation.
    pub id: String,
    /// Always stored lowercase.
    pub name: String,
    /// Whether the item is on the shopping list.
    pub needed: bool,
    /// Always stored lowercase; empty when uncategorized.
    pub category: String,
    /// Refreshed on every mutation of the row.
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A recipe row without its ingredients. Handlers never return this bare; see
/// [`RecipeWithIngredients`].
pub struct Recipe {
    pub id: String,
    /// Stored verbatim, no case folding.
    pub name: String,
    pub notes: String,
    /// Comma separated by convention, opaque to storage.
    pub tags: String,
    pub created_at: DateTime<Utc>,
    /// Also refreshed when an ingredient is linked or unlinked.
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Split the raw tag string into display chips. Empty segments and
    /// surrounding whitespace are dropped; storage keeps the original text.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Denormalized read view of a recipe with its current ingredient set.
pub struct RecipeWithIngredients {
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
}

impl RecipeWithIngredients {
    pub fn id(&self) -> &str {
        &self.recipe.id
    }

    /// True when the given ingredient is linked to this recipe.
    pub fn contains(&self, ingredient_id: &str) -> bool {
        self.ingredients
            .iter()
            .any(|ingredient| ingredient.id == ingredient_id)
    }
}

/// Input for creating an ingredient. Case folding happens in the handler, so
/// callers pass names exactly as typed.
#[derive(Debug, Clone, Default)]
pub struct NewIngredient {
    pub name: String,
    pub needed: bool,
    pub category: String,
}

impl NewIngredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for an ingredient. `None` leaves the stored value alone;
/// `Some("")` or `Some(false)` overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub needed: Option<bool>,
    pub category: Option<String>,
}

impl IngredientUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.needed.is_none() && self.category.is_none()
    }
}

/// Input for creating a recipe.
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub name: String,
    pub notes: String,
    pub tags: String,
}

impl NewRecipe {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a recipe, same presence semantics as
/// [`IngredientUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<String>,
}

impl RecipeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.notes.is_none() && self.tags.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe_with_tags(tags: &str) -> Recipe {
        let now = Utc::now();
        Recipe {
            id: "r1".to_string(),
            name: "Pancakes".to_string(),
            notes: String::new(),
            tags: tags.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tag_list_trims_and_skips_empty_segments() {
        let recipe = recipe_with_tags(" breakfast, sweet ,, quick ");
        assert_eq!(recipe.tag_list(), vec!["breakfast", "sweet", "quick"]);
    }

    #[test]
    fn tag_list_is_empty_for_blank_tags() {
        assert!(recipe_with_tags("").tag_list().is_empty());
        assert!(recipe_with_tags(" , ").tag_list().is_empty());
    }

    #[test]
    fn explicit_false_counts_as_a_present_field() {
        let update = IngredientUpdate {
            needed: Some(false),
            ..IngredientUpdate::default()
        };
        assert!(!update.is_empty());
        assert!(IngredientUpdate::default().is_empty());
        assert!(RecipeUpdate::default().is_empty());
    }
}
