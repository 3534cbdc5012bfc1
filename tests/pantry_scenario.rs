use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use pantry_manager::api::{
    create_ingredient, create_recipe, delete_ingredient, get_ingredient, get_recipe,
    link_ingredient, list_ingredients, list_recipes, unlink_ingredient, update_ingredient,
};
use pantry_manager::{db, Ingredient, IngredientUpdate, NewIngredient, NewRecipe};
use rusqlite::TransactionBehavior;
use tempfile::TempDir;

#[test]
fn pantry_round_trip_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("pantry.sqlite");
    let mut conn = db::open(&path).unwrap();

    let milk = create_ingredient(
        &mut conn,
        NewIngredient {
            name: "Milk".to_string(),
            needed: false,
            category: "Dairy".to_string(),
        },
    )
    .unwrap();
    assert_eq!(milk.name, "milk");
    assert_eq!(milk.category, "dairy");

    let pancakes = create_recipe(
        &mut conn,
        NewRecipe {
            name: "Pancakes".to_string(),
            notes: String::new(),
            tags: "breakfast".to_string(),
        },
    )
    .unwrap();
    assert!(pancakes.ingredients.is_empty());

    let linked = link_ingredient(&mut conn, pancakes.id(), &milk.id).unwrap();
    assert_eq!(linked.ingredients, vec![milk.clone()]);
    assert!(linked.recipe.updated_at > pancakes.recipe.updated_at);

    let again = link_ingredient(&mut conn, pancakes.id(), &milk.id).unwrap();
    assert_eq!(again, linked);

    let unlinked = unlink_ingredient(&mut conn, pancakes.id(), &milk.id).unwrap();
    assert!(unlinked.ingredients.is_empty());

    link_ingredient(&mut conn, pancakes.id(), &milk.id).unwrap();
    delete_ingredient(&mut conn, &milk.id).unwrap();
    assert!(get_ingredient(&mut conn, &milk.id).unwrap_err().is_not_found());
    assert!(get_recipe(&mut conn, pancakes.id())
        .unwrap()
        .ingredients
        .is_empty());
}

#[test]
fn data_survives_reopening_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pantry.sqlite");

    let (flour_id, recipe_id) = {
        let mut conn = db::open(&path).unwrap();
        let flour = create_ingredient(&mut conn, NewIngredient::named("Flour")).unwrap();
        update_ingredient(
            &mut conn,
            &flour.id,
            IngredientUpdate {
                needed: Some(true),
                ..IngredientUpdate::default()
            },
        )
        .unwrap();
        let bread = create_recipe(&mut conn, NewRecipe::named("Bread")).unwrap();
        link_ingredient(&mut conn, bread.id(), &flour.id).unwrap();
        (flour.id, bread.recipe.id)
    };

    let mut conn = db::open(&path).unwrap();
    let ingredients = list_ingredients(&mut conn).unwrap();
    assert_eq!(ingredients.len(), 1);
    assert!(ingredients[0].needed);
    assert_eq!(ingredients[0].id, flour_id);

    let recipes = list_recipes(&mut conn).unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].id(), recipe_id);
    assert!(recipes[0].contains(&flour_id));

    let err = create_ingredient(&mut conn, NewIngredient::named("FLOUR")).unwrap_err();
    assert!(err.is_duplicate_name());
    assert_eq!(err.status_code(), 400);
}

#[test]
fn concurrent_create_waits_for_the_writer_and_sees_its_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pantry.sqlite");
    let mut writer = db::open(&path).unwrap();
    let mut other = db::open(&path).unwrap();

    let tx = writer
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    db::insert_ingredient(
        &tx,
        &Ingredient {
            id: "held".to_string(),
            name: "milk".to_string(),
            needed: false,
            category: String::new(),
            updated_at: Utc::now(),
        },
    )
    .unwrap();

    let (started, wait_started) = mpsc::channel();
    let racer = thread::spawn(move || {
        started.send(()).unwrap();
        let result = create_ingredient(&mut other, NewIngredient::named("MILK"));
        (result, other)
    });

    wait_started.recv().unwrap();
    thread::sleep(Duration::from_millis(200));
    tx.commit().unwrap();

    let (result, _other) = racer.join().unwrap();
    let err = result.unwrap_err();
    assert!(err.is_duplicate_name(), "unexpected error: {err:?}");

    let ingredients = list_ingredients(&mut writer).unwrap();
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0].id, "held");
}
