use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Ingredient, IngredientUpdate, NewIngredient, NewRecipe, Recipe, RecipeUpdate};

/// Fields available within the ingredient form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum IngredientField {
    #[default]
    Name,
    Category,
    Needed,
}

/// Form state for ingredient creation/editing, including category
/// autocomplete tracking. When editing, `original` holds the row as loaded so
/// that only changed fields are submitted.
#[derive(Default, Clone)]
pub(crate) struct IngredientForm {
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) needed: bool,
    pub(crate) active: IngredientField,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
    original: Option<Ingredient>,
}

impl IngredientForm {
    pub(crate) fn from_ingredient(ingredient: &Ingredient) -> Self {
        Self {
            name: ingredient.name.clone(),
            category: ingredient.category.clone(),
            needed: ingredient.needed,
            original: Some(ingredient.clone()),
            ..Self::default()
        }
    }

    /// Cycle focus forward across the three fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            IngredientField::Name => IngredientField::Category,
            IngredientField::Category => IngredientField::Needed,
            IngredientField::Needed => IngredientField::Name,
        };
        if self.active != IngredientField::Category {
            self.suggestion = None;
        }
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            IngredientField::Name => IngredientField::Needed,
            IngredientField::Category => IngredientField::Name,
            IngredientField::Needed => IngredientField::Category,
        };
        if self.active != IngredientField::Category {
            self.suggestion = None;
        }
    }

    /// Insert a character into the active field. On the checkbox, space flips
    /// the value and y/n set it.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            IngredientField::Name => self.name.push(ch),
            IngredientField::Category => {
                self.autocomplete_disabled = false;
                self.category.push(ch);
            }
            IngredientField::Needed => match ch {
                ' ' => self.needed = !self.needed,
                'y' | 'Y' => self.needed = true,
                'n' | 'N' => self.needed = false,
                _ => return false,
            },
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            IngredientField::Name => {
                self.name.pop();
            }
            IngredientField::Category => {
                self.category.pop();
                self.autocomplete_disabled = false;
            }
            IngredientField::Needed => {}
        }
    }

    fn trimmed_name(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Ingredient name is required."));
        }
        Ok(name.to_string())
    }

    pub(crate) fn to_new_ingredient(&self) -> Result<NewIngredient> {
        Ok(NewIngredient {
            name: self.trimmed_name()?,
            needed: self.needed,
            category: self.category.trim().to_string(),
        })
    }

    /// Build a partial update holding only the fields that differ from the
    /// loaded row. Comparison happens after trimming and case folding, the
    /// same normalisation the store applies.
    pub(crate) fn to_update(&self) -> Result<IngredientUpdate> {
        let name = self.trimmed_name()?;
        let category = self.category.trim().to_string();
        let Some(original) = &self.original else {
            return Ok(IngredientUpdate {
                name: Some(name),
                needed: Some(self.needed),
                category: Some(category),
            });
        };

        Ok(IngredientUpdate {
            name: (name.to_lowercase() != original.name).then_some(name),
            needed: (self.needed != original.needed).then_some(self.needed),
            category: (category.to_lowercase() != original.category).then_some(category),
        })
    }

    /// Suggest an existing category once two characters have been typed.
    pub(crate) fn update_suggestion(&mut self, categories: &[String]) {
        if self.active != IngredientField::Category
            || self.autocomplete_disabled
            || self.category.chars().count() < 2
        {
            self.suggestion = None;
            return;
        }

        let current_lower = self.category.to_lowercase();
        self.suggestion = categories
            .iter()
            .find(|candidate| candidate.to_lowercase().starts_with(&current_lower))
            .filter(|candidate| candidate.to_lowercase() != current_lower)
            .cloned();
    }

    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_none() {
            return false;
        }
        match self.suggestion.take() {
            Some(candidate) => {
                self.category = candidate;
                self.autocomplete_disabled = true;
                true
            }
            None => false,
        }
    }

    /// Dismiss the current suggestion for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.has_active_suggestion() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    /// Remaining characters of the suggestion, shown ghosted after the input.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        let candidate = self.suggestion.as_ref()?;
        let mut chars = candidate.chars();
        for _ in 0..self.category.chars().count() {
            chars.next()?;
        }
        let suffix: String = chars.collect();
        (!suffix.is_empty()).then_some(suffix)
    }

    pub(crate) fn has_active_suggestion(&self) -> bool {
        self.active == IngredientField::Category && self.suggestion.is_some()
    }

    pub(crate) fn build_line(&self, field_name: &str, field: IngredientField) -> Line<'static> {
        let is_active = self.active == field;
        let active_style = Style::default().fg(Color::Yellow);
        let mut spans = vec![Span::raw(format!("{field_name}: "))];

        match field {
            IngredientField::Needed => {
                let mark = if self.needed { "[x] on shopping list" } else { "[ ] on shopping list" };
                let style = if is_active { active_style } else { Style::default() };
                spans.push(Span::styled(mark, style));
            }
            IngredientField::Name | IngredientField::Category => {
                let (value, placeholder) = match field {
                    IngredientField::Name => (&self.name, "<required>"),
                    _ => (&self.category, "<optional>"),
                };
                if value.is_empty() {
                    let style = if is_active {
                        active_style
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    if !(is_active && field == IngredientField::Category && self.suggestion.is_some()) {
                        spans.push(Span::styled(placeholder, style));
                    }
                } else {
                    let style = if is_active { active_style } else { Style::default() };
                    spans.push(Span::styled(value.clone(), style));
                }
                if field == IngredientField::Category && is_active {
                    if let Some(suffix) = self.suggestion_suffix() {
                        spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
                    }
                }
            }
        }

        Line::from(spans)
    }

    pub(crate) fn value_len(&self, field: IngredientField) -> usize {
        match field {
            IngredientField::Name => self.name.chars().count(),
            IngredientField::Category => self.category.chars().count(),
            IngredientField::Needed => 1,
        }
    }
}

/// Fields within the recipe form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum RecipeField {
    #[default]
    Name,
    Tags,
    Notes,
}

#[derive(Default, Clone)]
pub(crate) struct RecipeForm {
    pub(crate) name: String,
    pub(crate) tags: String,
    pub(crate) notes: String,
    pub(crate) active: RecipeField,
    pub(crate) error: Option<String>,
    original: Option<Recipe>,
}

impl RecipeForm {
    pub(crate) fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            tags: recipe.tags.clone(),
            notes: recipe.notes.clone(),
            original: Some(recipe.clone()),
            ..Self::default()
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            RecipeField::Name => RecipeField::Tags,
            RecipeField::Tags => RecipeField::Notes,
            RecipeField::Notes => RecipeField::Name,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            RecipeField::Name => RecipeField::Notes,
            RecipeField::Tags => RecipeField::Name,
            RecipeField::Notes => RecipeField::Tags,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.active_value_mut().push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.active_value_mut().pop();
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.active {
            RecipeField::Name => &mut self.name,
            RecipeField::Tags => &mut self.tags,
            RecipeField::Notes => &mut self.notes,
        }
    }

    fn trimmed_name(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Recipe name is required."));
        }
        Ok(name.to_string())
    }

    pub(crate) fn to_new_recipe(&self) -> Result<NewRecipe> {
        Ok(NewRecipe {
            name: self.trimmed_name()?,
            notes: self.notes.trim().to_string(),
            tags: self.tags.trim().to_string(),
        })
    }

    /// Only fields that changed relative to the loaded recipe.
    pub(crate) fn to_update(&self) -> Result<RecipeUpdate> {
        let name = self.trimmed_name()?;
        let notes = self.notes.trim().to_string();
        let tags = self.tags.trim().to_string();
        let Some(original) = &self.original else {
            return Ok(RecipeUpdate {
                name: Some(name),
                notes: Some(notes),
                tags: Some(tags),
            });
        };

        Ok(RecipeUpdate {
            name: (name != original.name).then_some(name),
            notes: (notes != original.notes).then_some(notes),
            tags: (tags != original.tags).then_some(tags),
        })
    }

    pub(crate) fn build_line(&self, field_name: &str, field: RecipeField) -> Line<'static> {
        let (value, placeholder) = match field {
            RecipeField::Name => (&self.name, "<required>"),
            RecipeField::Tags => (&self.tags, "<comma separated>"),
            RecipeField::Notes => (&self.notes, "<optional>"),
        };
        let is_active = self.active == field;

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: RecipeField) -> usize {
        match field {
            RecipeField::Name => self.name.chars().count(),
            RecipeField::Tags => self.tags.chars().count(),
            RecipeField::Notes => self.notes.chars().count(),
        }
    }
}

/// Confirmation state for deleting an ingredient everywhere.
pub(crate) struct ConfirmIngredientDelete {
    pub(crate) ingredient: Ingredient,
}

/// Confirmation state for deleting a recipe.
pub(crate) struct ConfirmRecipeDelete {
    pub(crate) recipe: Recipe,
    pub(crate) ingredient_count: usize,
}

/// Confirmation state for taking one ingredient off a recipe.
pub(crate) struct ConfirmUnlink {
    pub(crate) recipe_id: String,
    pub(crate) ingredient: Ingredient,
}
