use std::collections::HashSet;

use anyhow::Result;
use rusqlite::Connection;

use crate::api;
use crate::models::{Ingredient, RecipeWithIngredients};

/// Clamp `selected + offset` into `0..len`.
fn offset_index(selected: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let target = selected as isize + offset;
    target.clamp(0, len as isize - 1) as usize
}

/// Pantry list, optionally narrowed to items on the shopping list.
pub(crate) struct IngredientScreen {
    pub(crate) ingredients: Vec<Ingredient>,
    pub(crate) visible: Vec<Ingredient>,
    pub(crate) show_only_needed: bool,
    pub(crate) selected: usize,
}

impl IngredientScreen {
    pub(crate) fn new(ingredients: Vec<Ingredient>) -> Self {
        let mut screen = Self {
            ingredients,
            visible: Vec::new(),
            show_only_needed: false,
            selected: 0,
        };
        screen.apply_filter();
        screen
    }

    pub(crate) fn apply_filter(&mut self) {
        self.visible = if self.show_only_needed {
            self.ingredients
                .iter()
                .filter(|ingredient| ingredient.needed)
                .cloned()
                .collect()
        } else {
            self.ingredients.clone()
        };
        self.ensure_in_bounds();
    }

    pub(crate) fn toggle_show_needed(&mut self) -> bool {
        self.show_only_needed = !self.show_only_needed;
        self.apply_filter();
        self.show_only_needed
    }

    pub(crate) fn set_ingredients(&mut self, ingredients: Vec<Ingredient>) {
        self.ingredients = ingredients;
        self.apply_filter();
    }

    /// Move the cursor onto the ingredient with `id` when it is visible.
    pub(crate) fn focus(&mut self, id: &str) {
        if let Some(index) = self.visible.iter().position(|ingredient| ingredient.id == id) {
            self.selected = index;
        }
    }

    pub(crate) fn current(&self) -> Option<&Ingredient> {
        self.visible.get(self.selected)
    }

    pub(crate) fn needed_count(&self) -> usize {
        self.ingredients
            .iter()
            .filter(|ingredient| ingredient.needed)
            .count()
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = offset_index(self.selected, offset, self.visible.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.visible.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.visible.len() {
            self.selected = self.visible.len() - 1;
        }
    }
}

/// All recipes with their ingredient counts.
pub(crate) struct RecipeListScreen {
    pub(crate) recipes: Vec<RecipeWithIngredients>,
    pub(crate) selected: usize,
}

impl RecipeListScreen {
    pub(crate) fn new(recipes: Vec<RecipeWithIngredients>) -> Self {
        Self {
            recipes,
            selected: 0,
        }
    }

    pub(crate) fn current(&self) -> Option<&RecipeWithIngredients> {
        self.recipes.get(self.selected)
    }

    pub(crate) fn focus(&mut self, id: &str) {
        if let Some(index) = self.recipes.iter().position(|recipe| recipe.id() == id) {
            self.selected = index;
        }
    }

    pub(crate) fn set_recipes(&mut self, recipes: Vec<RecipeWithIngredients>) {
        self.recipes = recipes;
        if self.selected >= self.recipes.len() {
            self.selected = self.recipes.len().saturating_sub(1);
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = offset_index(self.selected, offset, self.recipes.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.recipes.len().saturating_sub(1);
    }
}

/// One recipe opened in full, cursor over its ingredient list.
pub(crate) struct RecipeScreen {
    pub(crate) recipe: RecipeWithIngredients,
    pub(crate) selected: usize,
}

impl RecipeScreen {
    pub(crate) fn new(recipe: RecipeWithIngredients) -> Self {
        Self {
            recipe,
            selected: 0,
        }
    }

    pub(crate) fn recipe_id(&self) -> &str {
        self.recipe.id()
    }

    pub(crate) fn current_ingredient(&self) -> Option<&Ingredient> {
        self.recipe.ingredients.get(self.selected)
    }

    /// Swap in a fresh view of the same recipe, keeping the cursor in range.
    pub(crate) fn replace(&mut self, recipe: RecipeWithIngredients) {
        self.recipe = recipe;
        if self.selected >= self.recipe.ingredients.len() {
            self.selected = self.recipe.ingredients.len().saturating_sub(1);
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = offset_index(self.selected, offset, self.recipe.ingredients.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.recipe.ingredients.len().saturating_sub(1);
    }
}

/// Picker for attaching ingredients to a recipe. The first entry creates a
/// brand-new ingredient; the rest can be checked and linked in one go.
pub(crate) struct LinkIngredientState {
    pub(crate) recipe_id: String,
    pub(crate) items: Vec<LinkItem>,
    pub(crate) selected: usize,
    pub(crate) checked: HashSet<String>,
}

#[derive(Clone)]
pub(crate) enum LinkItem {
    CreateNew,
    Existing(Ingredient),
}

impl LinkIngredientState {
    pub(crate) fn load(conn: &mut Connection, recipe_id: &str) -> Result<Self> {
        let available = api::available_ingredients(conn, recipe_id)?;
        Ok(Self::with_available(recipe_id, available))
    }

    fn with_available(recipe_id: &str, available: Vec<Ingredient>) -> Self {
        let mut items = vec![LinkItem::CreateNew];
        items.extend(available.into_iter().map(LinkItem::Existing));
        Self {
            recipe_id: recipe_id.to_string(),
            items,
            selected: 0,
            checked: HashSet::new(),
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = offset_index(self.selected, offset, self.items.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub(crate) fn current_item(&self) -> Option<&LinkItem> {
        self.items.get(self.selected)
    }

    pub(crate) fn is_checked(&self, index: usize) -> bool {
        matches!(
            self.items.get(index),
            Some(LinkItem::Existing(ingredient)) if self.checked.contains(&ingredient.id)
        )
    }

    pub(crate) fn toggle_current_selection(&mut self) {
        if let Some(LinkItem::Existing(ingredient)) = self.items.get(self.selected) {
            if !self.checked.remove(&ingredient.id) {
                self.checked.insert(ingredient.id.clone());
            }
        }
    }

    /// Checked ingredients in list order.
    pub(crate) fn checked_ingredients(&self) -> Vec<Ingredient> {
        self.items
            .iter()
            .filter_map(|item| match item {
                LinkItem::Existing(ingredient) if self.checked.contains(&ingredient.id) => {
                    Some(ingredient.clone())
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::open_in_memory;
    use crate::models::{NewIngredient, NewRecipe};

    fn ingredient(id: &str, name: &str, needed: bool) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: name.to_string(),
            needed,
            category: String::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn grocery_filter_keeps_only_needed_items() {
        let mut screen = IngredientScreen::new(vec![
            ingredient("1", "eggs", false),
            ingredient("2", "flour", true),
            ingredient("3", "milk", true),
        ]);
        screen.select_last();
        assert_eq!(screen.current().map(|i| i.name.as_str()), Some("milk"));

        assert!(screen.toggle_show_needed());
        assert_eq!(screen.visible.len(), 2);
        assert_eq!(screen.needed_count(), 2);
        assert_eq!(screen.selected, 1);

        screen.set_ingredients(vec![ingredient("2", "flour", true)]);
        assert_eq!(screen.selected, 0);
        assert_eq!(screen.current().map(|i| i.id.as_str()), Some("2"));

        assert!(!screen.toggle_show_needed());
        assert_eq!(screen.visible.len(), 1);
    }

    #[test]
    fn selection_is_clamped() {
        let mut screen = IngredientScreen::new(vec![
            ingredient("1", "eggs", false),
            ingredient("2", "milk", false),
        ]);
        screen.move_selection(10);
        assert_eq!(screen.selected, 1);
        screen.move_selection(-10);
        assert_eq!(screen.selected, 0);
        screen.focus("2");
        assert_eq!(screen.selected, 1);
        screen.focus("missing");
        assert_eq!(screen.selected, 1);

        let mut empty = IngredientScreen::new(Vec::new());
        empty.move_selection(1);
        empty.select_last();
        assert_eq!(empty.selected, 0);
        assert!(empty.current().is_none());
    }

    #[test]
    fn picker_offers_create_then_unlinked_ingredients() {
        let mut conn = open_in_memory().unwrap();
        let milk = api::create_ingredient(&mut conn, NewIngredient::named("milk")).unwrap();
        let eggs = api::create_ingredient(&mut conn, NewIngredient::named("eggs")).unwrap();
        let recipe = api::create_recipe(&mut conn, NewRecipe::named("Pancakes")).unwrap();
        api::link_ingredient(&mut conn, recipe.id(), &milk.id).unwrap();

        let mut picker = LinkIngredientState::load(&mut conn, recipe.id()).unwrap();
        assert_eq!(picker.items.len(), 2);
        assert!(matches!(picker.current_item(), Some(LinkItem::CreateNew)));

        picker.toggle_current_selection();
        assert!(picker.checked.is_empty());

        picker.move_selection(1);
        picker.toggle_current_selection();
        assert!(picker.is_checked(1));
        assert_eq!(picker.checked_ingredients(), vec![eggs]);

        picker.toggle_current_selection();
        assert!(picker.checked_ingredients().is_empty());
    }

    #[test]
    fn picker_for_unknown_recipe_fails() {
        let mut conn = open_in_memory().unwrap();
        assert!(LinkIngredientState::load(&mut conn, "missing").is_err());
    }
}
