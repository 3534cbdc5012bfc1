use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::debug;

use crate::api;
use crate::models::{Ingredient, IngredientUpdate, RecipeWithIngredients};

use super::forms::{
    ConfirmIngredientDelete, ConfirmRecipeDelete, ConfirmUnlink, IngredientField, IngredientForm,
    RecipeField, RecipeForm,
};
use super::helpers::{centered_rect, format_timestamp, needed_marker, surface_error, tag_spans};
use super::screens::{IngredientScreen, LinkIngredientState, LinkItem, RecipeListScreen, RecipeScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the tab bar above every screen.
const TABS_HEIGHT: u16 = 3;
/// Rows moved by PageUp/PageDown.
const PAGE: isize = 5;

/// High-level navigation states. The pantry and recipe lists live on `App`
/// so their cursors survive tab switches; a single opened recipe carries its
/// own state.
enum Screen {
    Ingredients,
    Recipes,
    Recipe(RecipeScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    AddingIngredient {
        /// Recipe that receives the new ingredient once it exists.
        link_to: Option<String>,
        form: IngredientForm,
    },
    EditingIngredient {
        id: String,
        form: IngredientForm,
    },
    ConfirmIngredientDelete(ConfirmIngredientDelete),
    AddingRecipe(RecipeForm),
    EditingRecipe {
        id: String,
        form: RecipeForm,
    },
    ConfirmRecipeDelete(ConfirmRecipeDelete),
    SelectingIngredient(LinkIngredientState),
    ConfirmUnlink(ConfirmUnlink),
}

/// Outcome of feeding one key into a modal form.
enum FormAction {
    Stay,
    Cancel,
    Submit,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    ingredients: IngredientScreen,
    recipes: RecipeListScreen,
    categories: Vec<String>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(mut conn: Connection) -> Result<Self> {
        let ingredients = api::list_ingredients(&mut conn)?;
        let recipes = api::list_recipes(&mut conn)?;
        let categories = api::list_categories(&mut conn)?;
        debug!(
            ingredients = ingredients.len(),
            recipes = recipes.len(),
            "loaded pantry"
        );
        Ok(Self {
            conn,
            ingredients: IngredientScreen::new(ingredients),
            recipes: RecipeListScreen::new(recipes),
            categories,
            screen: Screen::Ingredients,
            mode: Mode::Normal,
            status: None,
        })
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingIngredient { link_to, form } => {
                self.handle_add_ingredient(code, link_to, form)?
            }
            Mode::EditingIngredient { id, form } => self.handle_edit_ingredient(code, id, form)?,
            Mode::ConfirmIngredientDelete(confirm) => {
                self.handle_confirm_ingredient_delete(code, confirm)?
            }
            Mode::AddingRecipe(form) => self.handle_add_recipe(code, form)?,
            Mode::EditingRecipe { id, form } => self.handle_edit_recipe(code, id, form)?,
            Mode::ConfirmRecipeDelete(confirm) => {
                self.handle_confirm_recipe_delete(code, confirm)?
            }
            Mode::SelectingIngredient(state) => self.handle_select_ingredient(code, state)?,
            Mode::ConfirmUnlink(confirm) => self.handle_confirm_unlink(code, confirm)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Ctrl+E on an opened recipe edits the highlighted ingredient in place.
    pub(crate) fn handle_ctrl_e(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let ingredient = match &self.screen {
            Screen::Recipe(detail) => detail.current_ingredient().cloned(),
            _ => return Ok(()),
        };
        match ingredient {
            Some(ingredient) => {
                self.clear_status();
                self.mode = Mode::EditingIngredient {
                    id: ingredient.id.clone(),
                    form: IngredientForm::from_ingredient(&ingredient),
                };
            }
            None => self.set_status("No ingredient selected to edit.", StatusKind::Error),
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Ingredients => self.handle_ingredients_key(code, exit),
            Screen::Recipes => self.handle_recipes_key(code, exit),
            Screen::Recipe(_) => self.handle_recipe_key(code, exit),
        }
    }

    fn handle_ingredients_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.clear_status();
                self.open_recipes()?;
            }
            KeyCode::Up => self.ingredients.move_selection(-1),
            KeyCode::Down => self.ingredients.move_selection(1),
            KeyCode::PageUp => self.ingredients.move_selection(-PAGE),
            KeyCode::PageDown => self.ingredients.move_selection(PAGE),
            KeyCode::Home => self.ingredients.select_first(),
            KeyCode::End => self.ingredients.select_last(),
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingIngredient {
                    link_to: None,
                    form: IngredientForm::default(),
                });
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(ingredient) = self.ingredients.current().cloned() {
                    self.clear_status();
                    return Ok(Mode::EditingIngredient {
                        id: ingredient.id.clone(),
                        form: IngredientForm::from_ingredient(&ingredient),
                    });
                }
                self.set_status("No ingredient selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(ingredient) = self.ingredients.current().cloned() {
                    self.clear_status();
                    return Ok(Mode::ConfirmIngredientDelete(ConfirmIngredientDelete {
                        ingredient,
                    }));
                }
                self.set_status("No ingredient selected to delete.", StatusKind::Error);
            }
            KeyCode::Char(' ') => {
                if let Some(ingredient) = self.ingredients.current().cloned() {
                    self.toggle_needed(&ingredient);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                let message = if self.ingredients.toggle_show_needed() {
                    "Showing the shopping list."
                } else {
                    "Showing every ingredient."
                };
                self.set_status(message, StatusKind::Info);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_recipes_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => {
                self.clear_status();
                self.open_ingredients()?;
            }
            KeyCode::Up => self.recipes.move_selection(-1),
            KeyCode::Down => self.recipes.move_selection(1),
            KeyCode::PageUp => self.recipes.move_selection(-PAGE),
            KeyCode::PageDown => self.recipes.move_selection(PAGE),
            KeyCode::Home => self.recipes.select_first(),
            KeyCode::End => self.recipes.select_last(),
            KeyCode::Enter => {
                if let Some(id) = self.recipes.current().map(|recipe| recipe.id().to_string()) {
                    self.clear_status();
                    self.open_recipe_detail(&id)?;
                } else {
                    self.set_status("No recipe selected.", StatusKind::Error);
                }
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingRecipe(RecipeForm::default()));
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(view) = self.recipes.current() {
                    let mode = Mode::EditingRecipe {
                        id: view.id().to_string(),
                        form: RecipeForm::from_recipe(&view.recipe),
                    };
                    self.clear_status();
                    return Ok(mode);
                }
                self.set_status("No recipe selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(view) = self.recipes.current() {
                    let confirm = ConfirmRecipeDelete {
                        recipe: view.recipe.clone(),
                        ingredient_count: view.ingredients.len(),
                    };
                    self.clear_status();
                    return Ok(Mode::ConfirmRecipeDelete(confirm));
                }
                self.set_status("No recipe selected to delete.", StatusKind::Error);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_recipe_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Recipe(detail) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Up => detail.move_selection(-1),
            KeyCode::Down => detail.move_selection(1),
            KeyCode::PageUp => detail.move_selection(-PAGE),
            KeyCode::PageDown => detail.move_selection(PAGE),
            KeyCode::Home => detail.select_first(),
            KeyCode::End => detail.select_last(),
            KeyCode::Esc => {
                let id = detail.recipe_id().to_string();
                self.clear_status();
                self.reload_recipes(Some(&id))?;
                self.screen = Screen::Recipes;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.clear_status();
                self.open_ingredients()?;
            }
            KeyCode::Char('+') => {
                let recipe_id = detail.recipe_id().to_string();
                self.clear_status();
                let state = LinkIngredientState::load(&mut self.conn, &recipe_id)?;
                return Ok(Mode::SelectingIngredient(state));
            }
            KeyCode::Char('-') => {
                if let Some(ingredient) = detail.current_ingredient().cloned() {
                    let recipe_id = detail.recipe_id().to_string();
                    self.clear_status();
                    return Ok(Mode::ConfirmUnlink(ConfirmUnlink {
                        recipe_id,
                        ingredient,
                    }));
                }
                self.set_status("No ingredient selected to remove.", StatusKind::Error);
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                let mode = Mode::EditingRecipe {
                    id: detail.recipe_id().to_string(),
                    form: RecipeForm::from_recipe(&detail.recipe.recipe),
                };
                self.clear_status();
                return Ok(mode);
            }
            KeyCode::Char(' ') => {
                if let Some(ingredient) = detail.current_ingredient().cloned() {
                    self.toggle_needed(&ingredient);
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Feed a key into the ingredient form, handling category autocomplete.
    fn drive_ingredient_form(&self, code: KeyCode, form: &mut IngredientForm) -> FormAction {
        match code {
            KeyCode::Esc => {
                if form.cancel_autocomplete() {
                    return FormAction::Stay;
                }
                return FormAction::Cancel;
            }
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab => {
                let consumed = form.has_active_suggestion() && form.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
            }
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => return FormAction::Stay,
        }
        form.update_suggestion(&self.categories);
        FormAction::Stay
    }

    fn drive_recipe_form(code: KeyCode, form: &mut RecipeForm) -> FormAction {
        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab => form.toggle_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        FormAction::Stay
    }

    fn handle_add_ingredient(
        &mut self,
        code: KeyCode,
        link_to: Option<String>,
        mut form: IngredientForm,
    ) -> Result<Mode> {
        match self.drive_ingredient_form(code, &mut form) {
            FormAction::Stay => {}
            FormAction::Cancel => {
                self.set_status("Add ingredient cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            FormAction::Submit => match self.save_new_ingredient(&form, link_to.as_deref()) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => self.report_form_error(&mut form.error, &err),
            },
        }
        Ok(Mode::AddingIngredient { link_to, form })
    }

    fn handle_edit_ingredient(
        &mut self,
        code: KeyCode,
        id: String,
        mut form: IngredientForm,
    ) -> Result<Mode> {
        match self.drive_ingredient_form(code, &mut form) {
            FormAction::Stay => {}
            FormAction::Cancel => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            FormAction::Submit => match self.save_existing_ingredient(&id, &form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => self.report_form_error(&mut form.error, &err),
            },
        }
        Ok(Mode::EditingIngredient { id, form })
    }

    fn handle_confirm_ingredient_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmIngredientDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_ingredient_delete(&confirm.ingredient) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::ConfirmIngredientDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmIngredientDelete(confirm)),
        }
    }

    fn handle_add_recipe(&mut self, code: KeyCode, mut form: RecipeForm) -> Result<Mode> {
        match Self::drive_recipe_form(code, &mut form) {
            FormAction::Stay => {}
            FormAction::Cancel => {
                self.set_status("Add recipe cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            FormAction::Submit => match self.save_new_recipe(&form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => self.report_form_error(&mut form.error, &err),
            },
        }
        Ok(Mode::AddingRecipe(form))
    }

    fn handle_edit_recipe(&mut self, code: KeyCode, id: String, mut form: RecipeForm) -> Result<Mode> {
        match Self::drive_recipe_form(code, &mut form) {
            FormAction::Stay => {}
            FormAction::Cancel => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            FormAction::Submit => match self.save_existing_recipe(&id, &form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => self.report_form_error(&mut form.error, &err),
            },
        }
        Ok(Mode::EditingRecipe { id, form })
    }

    fn handle_confirm_recipe_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmRecipeDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_recipe_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::ConfirmRecipeDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmRecipeDelete(confirm)),
        }
    }

    fn handle_select_ingredient(
        &mut self,
        code: KeyCode,
        mut state: LinkIngredientState,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc => return Ok(Mode::Normal),
            KeyCode::Up => state.move_selection(-1),
            KeyCode::Down => state.move_selection(1),
            KeyCode::PageUp => state.move_selection(-PAGE),
            KeyCode::PageDown => state.move_selection(PAGE),
            KeyCode::Home => state.select_first(),
            KeyCode::End => state.select_last(),
            KeyCode::Char(' ') => state.toggle_current_selection(),
            KeyCode::Enter => {
                let mut targets = state.checked_ingredients();
                if targets.is_empty() {
                    match state.current_item() {
                        Some(LinkItem::CreateNew) => {
                            return Ok(Mode::AddingIngredient {
                                link_to: Some(state.recipe_id.clone()),
                                form: IngredientForm::default(),
                            });
                        }
                        Some(LinkItem::Existing(ingredient)) => targets.push(ingredient.clone()),
                        None => return Ok(Mode::Normal),
                    }
                }

                match self.link_ingredients(&state.recipe_id, &targets) {
                    Ok(()) => {
                        let message = match targets.as_slice() {
                            [single] => format!("Added {single} to the recipe."),
                            _ => format!("Added {} ingredients to the recipe.", targets.len()),
                        };
                        self.set_status(message, StatusKind::Info);
                        return Ok(Mode::Normal);
                    }
                    Err(err) => {
                        self.refresh_open_recipe()?;
                        self.set_status(surface_error(&err), StatusKind::Error);
                    }
                }
            }
            _ => {}
        }
        Ok(Mode::SelectingIngredient(state))
    }

    fn handle_confirm_unlink(&mut self, code: KeyCode, confirm: ConfirmUnlink) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Removal cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match api::unlink_ingredient(&mut self.conn, &confirm.recipe_id, &confirm.ingredient.id) {
                    Ok(view) => {
                        self.replace_open_recipe(view);
                        self.set_status(
                            format!("Removed {} from the recipe.", confirm.ingredient),
                            StatusKind::Info,
                        );
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        self.set_status(surface_error(&anyhow::Error::from(err)), StatusKind::Error);
                        Ok(Mode::ConfirmUnlink(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmUnlink(confirm)),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(TABS_HEIGHT), Constraint::Min(0)])
            .split(content_area);
        self.draw_tabs(frame, chunks[0]);

        match &self.screen {
            Screen::Ingredients => self.draw_ingredients(frame, chunks[1]),
            Screen::Recipes => self.draw_recipe_list(frame, chunks[1]),
            Screen::Recipe(detail) => self.draw_recipe_detail(frame, chunks[1], detail),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingIngredient { link_to, form } => {
                let title = if link_to.is_some() {
                    "New Ingredient for Recipe"
                } else {
                    "Add Ingredient"
                };
                self.draw_ingredient_form(frame, area, title, form)
            }
            Mode::EditingIngredient { form, .. } => {
                self.draw_ingredient_form(frame, area, "Edit Ingredient", form)
            }
            Mode::ConfirmIngredientDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Ingredient",
                vec![
                    Line::from(format!("Delete '{}' from the pantry?", confirm.ingredient)),
                    Line::from("It will also be removed from every recipe."),
                ],
            ),
            Mode::AddingRecipe(form) => self.draw_recipe_form(frame, area, "Add Recipe", form),
            Mode::EditingRecipe { form, .. } => {
                self.draw_recipe_form(frame, area, "Edit Recipe", form)
            }
            Mode::ConfirmRecipeDelete(confirm) => {
                let count = confirm.ingredient_count;
                let noun = if count == 1 { "ingredient" } else { "ingredients" };
                self.draw_confirm(
                    frame,
                    area,
                    "Delete Recipe",
                    vec![
                        Line::from(format!("Delete recipe '{}'?", confirm.recipe)),
                        Line::from(format!("Its {count} {noun} stay in the pantry.")),
                    ],
                )
            }
            Mode::SelectingIngredient(state) => self.draw_link_picker(frame, area, state),
            Mode::ConfirmUnlink(confirm) => self.draw_confirm(
                frame,
                area,
                "Remove Ingredient",
                vec![Line::from(format!(
                    "Remove '{}' from this recipe?",
                    confirm.ingredient
                ))],
            ),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let selected: usize = match self.screen {
            Screen::Ingredients => 0,
            Screen::Recipes | Screen::Recipe(_) => 1,
        };
        let tabs = Tabs::new(vec!["Pantry", "Recipes"])
            .block(Block::default().borders(Borders::ALL).title("Pantry Manager"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected);
        frame.render_widget(tabs, area);
    }

    fn draw_ingredients(&self, frame: &mut Frame, area: Rect) {
        let screen = &self.ingredients;
        let title = if screen.show_only_needed {
            format!("Shopping List ({})", screen.visible.len())
        } else {
            format!(
                "Ingredients ({} total, {} needed)",
                screen.ingredients.len(),
                screen.needed_count()
            )
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        if screen.visible.is_empty() {
            let message = if screen.show_only_needed {
                "Nothing on the shopping list."
            } else {
                "No ingredients yet. Press '+' to add one."
            };
            let paragraph = Paragraph::new(message)
                .block(block)
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = screen
            .visible
            .iter()
            .map(|ingredient| ListItem::new(ingredient_line(ingredient)))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(screen.selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_recipe_list(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Recipes ({})", self.recipes.recipes.len()));

        if self.recipes.recipes.is_empty() {
            let paragraph = Paragraph::new("No recipes yet. Press '+' to add one.")
                .block(block)
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .recipes
            .recipes
            .iter()
            .map(|view| {
                let mut title = vec![
                    Span::styled(
                        view.recipe.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                ];
                title.extend(tag_spans(&view.recipe.tag_list()));

                let needed = view.ingredients.iter().filter(|i| i.needed).count();
                let summary = Line::from(Span::styled(
                    format!("  {} ingredients, {} to buy", view.ingredients.len(), needed),
                    Style::default().fg(Color::DarkGray),
                ));
                ListItem::new(vec![Line::from(title), summary])
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(self.recipes.selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_recipe_detail(&self, frame: &mut Frame, area: Rect, detail: &RecipeScreen) {
        let recipe = &detail.recipe.recipe;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let mut tags = tag_spans(&recipe.tag_list());
        if tags.is_empty() {
            tags.push(Span::styled("no tags", Style::default().fg(Color::DarkGray)));
        }
        let header = Paragraph::new(vec![
            Line::from(tags),
            Line::from(Span::styled(
                format!(
                    "Created {}   Updated {}",
                    format_timestamp(recipe.created_at),
                    format_timestamp(recipe.updated_at)
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    recipe.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
        );
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let ingredients_block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Ingredients ({})", detail.recipe.ingredients.len()));
        if detail.recipe.ingredients.is_empty() {
            let paragraph = Paragraph::new("No ingredients yet. Press '+' to add some.")
                .block(ingredients_block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, body[0]);
        } else {
            let items: Vec<ListItem> = detail
                .recipe
                .ingredients
                .iter()
                .map(|ingredient| ListItem::new(ingredient_line(ingredient)))
                .collect();
            let list = List::new(items)
                .block(ingredients_block)
                .highlight_style(Style::default().fg(Color::Yellow))
                .highlight_symbol("▶ ");
            let mut list_state = ListState::default();
            list_state.select(Some(detail.selected));
            frame.render_stateful_widget(list, body[0], &mut list_state);
        }

        let notes = if recipe.notes.trim().is_empty() {
            Text::from(Span::styled("No notes.", Style::default().fg(Color::DarkGray)))
        } else {
            Text::from(recipe.notes.clone())
        };
        let notes = Paragraph::new(notes)
            .block(Block::default().borders(Borders::ALL).title("Notes"))
            .wrap(Wrap { trim: false });
        frame.render_widget(notes, body[1]);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let hints: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::SelectingIngredient(_)) => &[
                ("[↑↓]", "Navigate"),
                ("[Space]", "Toggle"),
                ("[Enter]", "Add Selected"),
                ("[Esc]", "Cancel"),
            ],
            (Screen::Ingredients, _) => &[
                ("[↑↓]", "Select"),
                ("[Space]", "Toggle Needed"),
                ("[n]", "Shopping List"),
                ("[+]", "Add"),
                ("[-]", "Delete"),
                ("[e]", "Edit"),
                ("[Tab]", "Recipes"),
                ("[q]", "Quit"),
            ],
            (Screen::Recipes, _) => &[
                ("[↑↓]", "Select"),
                ("[Enter]", "Open"),
                ("[+]", "Add"),
                ("[-]", "Delete"),
                ("[e]", "Edit"),
                ("[Tab]", "Pantry"),
                ("[q]", "Quit"),
            ],
            (Screen::Recipe(_), _) => &[
                ("[↑↓]", "Select"),
                ("[Space]", "Toggle Needed"),
                ("[+]", "Add Ingredient"),
                ("[-]", "Remove"),
                ("[e]", "Edit Recipe"),
                ("[Ctrl+E]", "Edit Ingredient"),
                ("[Esc]", "Back"),
                ("[q]", "Quit"),
            ],
        };

        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let mut spans = Vec::with_capacity(hints.len() * 2);
        for (index, (key, label)) in hints.iter().enumerate() {
            spans.push(Span::styled(*key, key_style));
            let gap = if index + 1 == hints.len() { "" } else { "   " };
            spans.push(Span::raw(format!(" {label}{gap}")));
        }
        Line::from(spans)
    }

    fn draw_ingredient_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &IngredientForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Name", IngredientField::Name),
            form.build_line("Category", IngredientField::Category),
            form.build_line("Needed", IngredientField::Needed),
            Line::from(""),
        ];
        lines.push(form_hint(
            form.error.as_deref(),
            "Enter to save • Tab to accept/switch • Space toggles Needed • Esc to cancel",
        ));

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (prefix, row) = match form.active {
            IngredientField::Name => ("Name: ", 0),
            IngredientField::Category => ("Category: ", 1),
            IngredientField::Needed => ("Needed: ", 2),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x, inner.y + row));
    }

    fn draw_recipe_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &RecipeForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            form.build_line("Name", RecipeField::Name),
            form.build_line("Tags", RecipeField::Tags),
            form.build_line("Notes", RecipeField::Notes),
            Line::from(""),
            form_hint(
                form.error.as_deref(),
                "Enter to save • Tab to switch • Esc to cancel",
            ),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (prefix, row) = match form.active {
            RecipeField::Name => ("Name: ", 0),
            RecipeField::Tags => ("Tags: ", 1),
            RecipeField::Notes => ("Notes: ", 2),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y + row));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, mut lines: Vec<Line<'static>>) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm, N or Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_link_picker(&self, frame: &mut Frame, area: Rect, state: &LinkIngredientState) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Add Ingredient to Recipe")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let items: Vec<ListItem> = state
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                LinkItem::CreateNew => ListItem::new("Create a new ingredient"),
                LinkItem::Existing(ingredient) => {
                    let checkbox = if state.is_checked(index) { "[x]" } else { "[ ]" };
                    let mut spans = vec![Span::raw(format!("{checkbox} {}", ingredient.name))];
                    if !ingredient.category.is_empty() {
                        spans.push(Span::styled(
                            format!("  ({})", ingredient.category),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    ListItem::new(Line::from(spans))
                }
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::NONE))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn report_form_error(&mut self, slot: &mut Option<String>, err: &anyhow::Error) {
        let message = surface_error(err);
        *slot = Some(message.clone());
        self.set_status(message, StatusKind::Error);
    }

    fn toggle_needed(&mut self, ingredient: &Ingredient) {
        let changes = IngredientUpdate {
            needed: Some(!ingredient.needed),
            ..IngredientUpdate::default()
        };
        let result = api::update_ingredient(&mut self.conn, &ingredient.id, changes)
            .map_err(anyhow::Error::from)
            .and_then(|updated| {
                self.reload_ingredients(Some(&updated.id))?;
                self.refresh_open_recipe()?;
                Ok(updated)
            });
        match result {
            Ok(updated) if updated.needed => {
                self.set_status(format!("Added {updated} to the shopping list."), StatusKind::Info)
            }
            Ok(updated) => self.set_status(
                format!("Took {updated} off the shopping list."),
                StatusKind::Info,
            ),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn save_new_ingredient(&mut self, form: &IngredientForm, link_to: Option<&str>) -> Result<()> {
        let input = form.to_new_ingredient()?;
        let ingredient = api::create_ingredient(&mut self.conn, input)?;
        self.reload_ingredients(Some(&ingredient.id))?;
        self.reload_categories()?;

        match link_to {
            Some(recipe_id) => {
                let view = api::link_ingredient(&mut self.conn, recipe_id, &ingredient.id)?;
                self.replace_open_recipe(view);
                self.set_status(
                    format!("Created {ingredient} and added it to the recipe."),
                    StatusKind::Info,
                );
            }
            None => self.set_status(format!("Added {ingredient}."), StatusKind::Info),
        }
        Ok(())
    }

    fn save_existing_ingredient(&mut self, id: &str, form: &IngredientForm) -> Result<()> {
        let changes = form.to_update()?;
        if changes.is_empty() {
            self.set_status("Nothing changed.", StatusKind::Info);
            return Ok(());
        }
        let ingredient = api::update_ingredient(&mut self.conn, id, changes)?;
        self.reload_ingredients(Some(id))?;
        self.reload_categories()?;
        self.refresh_open_recipe()?;
        self.set_status(format!("Updated {ingredient}."), StatusKind::Info);
        Ok(())
    }

    fn perform_ingredient_delete(&mut self, ingredient: &Ingredient) -> Result<()> {
        api::delete_ingredient(&mut self.conn, &ingredient.id)?;
        self.reload_ingredients(None)?;
        self.reload_categories()?;
        self.refresh_open_recipe()?;
        self.set_status(format!("Deleted {ingredient}."), StatusKind::Info);
        Ok(())
    }

    fn save_new_recipe(&mut self, form: &RecipeForm) -> Result<()> {
        let input = form.to_new_recipe()?;
        let view = api::create_recipe(&mut self.conn, input)?;
        self.reload_recipes(Some(view.id()))?;
        self.set_status(format!("Added {}.", view.recipe), StatusKind::Info);
        Ok(())
    }

    fn save_existing_recipe(&mut self, id: &str, form: &RecipeForm) -> Result<()> {
        let changes = form.to_update()?;
        if changes.is_empty() {
            self.set_status("Nothing changed.", StatusKind::Info);
            return Ok(());
        }
        let view = api::update_recipe(&mut self.conn, id, changes)?;
        self.set_status(format!("Updated {}.", view.recipe), StatusKind::Info);
        self.replace_open_recipe(view);
        self.reload_recipes(Some(id))?;
        Ok(())
    }

    fn perform_recipe_delete(&mut self, confirm: &ConfirmRecipeDelete) -> Result<()> {
        api::delete_recipe(&mut self.conn, &confirm.recipe.id)?;
        self.reload_recipes(None)?;
        self.screen = Screen::Recipes;
        self.set_status(format!("Deleted {}.", confirm.recipe), StatusKind::Info);
        Ok(())
    }

    fn link_ingredients(&mut self, recipe_id: &str, ingredients: &[Ingredient]) -> Result<()> {
        for ingredient in ingredients {
            let view = api::link_ingredient(&mut self.conn, recipe_id, &ingredient.id)?;
            self.replace_open_recipe(view);
        }
        Ok(())
    }

    fn open_ingredients(&mut self) -> Result<()> {
        self.reload_ingredients(None)?;
        self.screen = Screen::Ingredients;
        Ok(())
    }

    fn open_recipes(&mut self) -> Result<()> {
        self.reload_recipes(None)?;
        self.screen = Screen::Recipes;
        Ok(())
    }

    fn open_recipe_detail(&mut self, id: &str) -> Result<()> {
        let view = api::get_recipe(&mut self.conn, id)?;
        self.screen = Screen::Recipe(RecipeScreen::new(view));
        Ok(())
    }

    /// Swap in a fresh view if it belongs to the recipe currently open.
    fn replace_open_recipe(&mut self, view: RecipeWithIngredients) {
        if let Screen::Recipe(detail) = &mut self.screen {
            if detail.recipe_id() == view.id() {
                detail.replace(view);
            }
        }
    }

    fn refresh_open_recipe(&mut self) -> Result<()> {
        let id = match &self.screen {
            Screen::Recipe(detail) => detail.recipe_id().to_string(),
            _ => return Ok(()),
        };
        let view = api::get_recipe(&mut self.conn, &id)?;
        self.replace_open_recipe(view);
        Ok(())
    }

    fn reload_ingredients(&mut self, focus_id: Option<&str>) -> Result<()> {
        let ingredients = api::list_ingredients(&mut self.conn)?;
        self.ingredients.set_ingredients(ingredients);
        if let Some(id) = focus_id {
            self.ingredients.focus(id);
        }
        Ok(())
    }

    fn reload_recipes(&mut self, focus_id: Option<&str>) -> Result<()> {
        let recipes = api::list_recipes(&mut self.conn)?;
        self.recipes.set_recipes(recipes);
        if let Some(id) = focus_id {
            self.recipes.focus(id);
        }
        Ok(())
    }

    fn reload_categories(&mut self) -> Result<()> {
        self.categories = api::list_categories(&mut self.conn)?;
        Ok(())
    }
}

fn ingredient_line(ingredient: &Ingredient) -> Line<'static> {
    let mut spans = vec![needed_marker(ingredient.needed), Span::raw(ingredient.name.clone())];
    if !ingredient.category.is_empty() {
        spans.push(Span::styled(
            format!("  ({})", ingredient.category),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn form_hint(error: Option<&str>, hint: &'static str) -> Line<'static> {
    match error {
        Some(error) => Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::models::NewIngredient;

    fn press(app: &mut App, codes: &[KeyCode]) {
        for code in codes {
            app.handle_key(*code).unwrap();
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn open_recipe(app: &App) -> &RecipeWithIngredients {
        match &app.screen {
            Screen::Recipe(detail) => &detail.recipe,
            _ => panic!("no recipe open"),
        }
    }

    #[test]
    fn adding_an_ingredient_through_the_form() {
        let mut app = App::new(open_in_memory().unwrap()).unwrap();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "Milk");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Dairy");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        let current = app.ingredients.current().unwrap();
        assert_eq!(current.name, "milk");
        assert_eq!(current.category, "dairy");
        assert_eq!(app.categories, vec!["dairy"]);
    }

    #[test]
    fn duplicate_name_keeps_the_form_open() {
        let mut conn = open_in_memory().unwrap();
        api::create_ingredient(&mut conn, NewIngredient::named("milk")).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "MILK");
        press(&mut app, &[KeyCode::Enter]);

        match &app.mode {
            Mode::AddingIngredient { form, .. } => assert_eq!(
                form.error.as_deref(),
                Some("Ingredient with name 'milk' already exists")
            ),
            _ => panic!("form should stay open"),
        }
        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.ingredients.ingredients.len(), 1);
    }

    #[test]
    fn space_toggles_needed_and_n_filters() {
        let mut conn = open_in_memory().unwrap();
        api::create_ingredient(&mut conn, NewIngredient::named("eggs")).unwrap();
        api::create_ingredient(&mut conn, NewIngredient::named("milk")).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, &[KeyCode::Down, KeyCode::Char(' ')]);
        assert!(app.ingredients.current().unwrap().needed);
        assert_eq!(app.ingredients.needed_count(), 1);

        press(&mut app, &[KeyCode::Char('n')]);
        assert_eq!(app.ingredients.visible.len(), 1);
        assert_eq!(app.ingredients.current().unwrap().name, "milk");
    }

    #[test]
    fn deleting_an_ingredient_asks_first() {
        let mut conn = open_in_memory().unwrap();
        api::create_ingredient(&mut conn, NewIngredient::named("milk")).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('n')]);
        assert_eq!(app.ingredients.ingredients.len(), 1);

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('y')]);
        assert!(app.ingredients.ingredients.is_empty());
    }

    #[test]
    fn recipe_flow_links_and_unlinks() {
        let mut conn = open_in_memory().unwrap();
        let milk = api::create_ingredient(&mut conn, NewIngredient::named("milk")).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, &[KeyCode::Tab, KeyCode::Char('+')]);
        type_text(&mut app, "Pancakes");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "breakfast");
        press(&mut app, &[KeyCode::Enter, KeyCode::Enter]);
        assert_eq!(open_recipe(&app).recipe.name, "Pancakes");
        assert_eq!(open_recipe(&app).recipe.tag_list(), vec!["breakfast"]);

        press(
            &mut app,
            &[
                KeyCode::Char('+'),
                KeyCode::Down,
                KeyCode::Char(' '),
                KeyCode::Enter,
            ],
        );
        assert!(matches!(app.mode, Mode::Normal));
        assert!(open_recipe(&app).contains(&milk.id));

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('y')]);
        assert!(open_recipe(&app).ingredients.is_empty());

        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.screen, Screen::Recipes));
        assert_eq!(app.recipes.current().unwrap().recipe.name, "Pancakes");
    }

    #[test]
    fn picker_can_create_and_link_in_one_step() {
        let mut conn = open_in_memory().unwrap();
        api::create_recipe(&mut conn, crate::models::NewRecipe::named("Omelette")).unwrap();
        let mut app = App::new(conn).unwrap();

        press(
            &mut app,
            &[KeyCode::Tab, KeyCode::Enter, KeyCode::Char('+'), KeyCode::Enter],
        );
        assert!(matches!(
            app.mode,
            Mode::AddingIngredient {
                link_to: Some(_),
                ..
            }
        ));

        type_text(&mut app, "Eggs");
        press(&mut app, &[KeyCode::Enter]);

        let recipe = open_recipe(&app);
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.ingredients[0].name, "eggs");
        assert_eq!(app.ingredients.ingredients.len(), 1);
    }

    #[test]
    fn editing_a_recipe_from_the_detail_view() {
        let mut conn = open_in_memory().unwrap();
        api::create_recipe(&mut conn, crate::models::NewRecipe::named("Soup")).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, &[KeyCode::Tab, KeyCode::Enter, KeyCode::Char('e')]);
        type_text(&mut app, "!");
        press(&mut app, &[KeyCode::Enter]);

        assert_eq!(open_recipe(&app).recipe.name, "Soup!");
        assert!(open_recipe(&app).recipe.updated_at > open_recipe(&app).recipe.created_at);
    }
}
