//! Typed failures returned by the pantry handlers.

use thiserror::Error;

/// Which table an unresolved id was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Ingredient,
    Recipe,
}

impl Entity {
    fn label(self) -> &'static str {
        match self {
            Entity::Ingredient => "Ingredient",
            Entity::Recipe => "Recipe",
        }
    }
}

#[derive(Debug, Error)]
pub enum PantryError {
    #[error("{} not found", .entity.label())]
    NotFound { entity: Entity, id: String },

    #[error("Ingredient with name '{0}' already exists")]
    DuplicateName(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type PantryResult<T> = Result<T, PantryError>;

impl PantryError {
    pub(crate) fn ingredient_not_found(id: &str) -> Self {
        PantryError::NotFound {
            entity: Entity::Ingredient,
            id: id.to_string(),
        }
    }

    pub(crate) fn recipe_not_found(id: &str) -> Self {
        PantryError::NotFound {
            entity: Entity::Recipe,
            id: id.to_string(),
        }
    }

    /// HTTP status an outer transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            PantryError::DuplicateName(_) => 400,
            PantryError::NotFound { .. } => 404,
            PantryError::Storage(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PantryError::NotFound { .. })
    }

    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, PantryError::DuplicateName(_))
    }
}
