mod common;

use common::*;
use serde_json::{json, Value};
use strata_orm::{ActiveRecord, ModelError, Related};

fn loaded_len(record: &strata_orm::Record, relation: &str) -> Option<usize> {
    record.loaded(relation).map(Related::len)
}

#[tokio::test]
async fn test_has_many_counts_per_project() {
    let (manager, _) = setup().await;

    let projects = Project::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["users"])
        .all()
        .await
        .unwrap();

    let counts: Vec<Option<usize>> = projects.iter().map(|p| loaded_len(p, "users")).collect();
    assert_eq!(counts, vec![Some(2), Some(2), Some(0)]);

    let mercury = projects.get(2usize).unwrap();
    assert!(mercury.loaded("users").unwrap().as_many().unwrap().is_empty());
}

#[tokio::test]
async fn test_eager_loading_issues_one_query_per_relation() {
    let (manager, driver) = setup().await;
    // warm the schema cache so only statements are counted
    Project::table(&manager).await.unwrap();
    User::table(&manager).await.unwrap();
    driver.reset();

    let projects = Project::find(&manager)
        .await
        .unwrap()
        .with(["users"])
        .all()
        .await
        .unwrap();
    assert_eq!(projects.len(), 3);
    assert_eq!(driver.queries(), 2);
}

#[tokio::test]
async fn test_lazy_loading_issues_one_query_per_record() {
    let (manager, driver) = setup().await;
    Project::table(&manager).await.unwrap();
    User::table(&manager).await.unwrap();
    driver.reset();

    let mut projects = Project::find(&manager).await.unwrap().all().await.unwrap();
    let mut total = 0;
    for project in projects.iter_mut() {
        total += project.related("users").await.unwrap().len();
    }
    assert_eq!(total, 4);
    assert_eq!(driver.queries(), 4);

    // cached after first access
    for project in projects.iter_mut() {
        project.related("users").await.unwrap();
    }
    assert_eq!(driver.queries(), 4);
}

#[tokio::test]
async fn test_nested_relations() {
    let (manager, driver) = setup().await;
    Project::table(&manager).await.unwrap();
    User::table(&manager).await.unwrap();
    Tag::table(&manager).await.unwrap();
    driver.reset();

    let projects = Project::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["users.tags", "users"])
        .all()
        .await
        .unwrap();
    assert_eq!(driver.queries(), 3);

    let apollo_users = projects
        .first()
        .and_then(|p| p.loaded("users"))
        .and_then(Related::as_many)
        .unwrap();
    let ada = apollo_users
        .iter()
        .find(|u| u.value("name").unwrap() == json!("Ada"))
        .unwrap();
    let grace = apollo_users
        .iter()
        .find(|u| u.value("name").unwrap() == json!("Grace"))
        .unwrap();
    assert_eq!(loaded_len(ada, "tags"), Some(2));
    assert_eq!(loaded_len(grace, "tags"), Some(0));
}

#[tokio::test]
async fn test_depth_budget_stops_nesting() {
    let (manager, _) = setup().await;

    let projects = Project::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["users.project"])
        .with_depth(1)
        .all()
        .await
        .unwrap();

    let apollo = projects.first().unwrap();
    let users = apollo.loaded("users").and_then(Related::as_many).unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| !u.is_loaded("project")));

    // zero budget loads nothing at all
    let projects = Project::find(&manager)
        .await
        .unwrap()
        .with(["users"])
        .with_depth(0)
        .all()
        .await
        .unwrap();
    assert!(projects.iter().all(|p| !p.is_loaded("users")));
}

/// Follows `users.project` pairs down from a project and returns the
/// projects reached at the bottom
fn projects_below<'a>(project: &'a strata_orm::Record, hops: usize) -> Vec<&'a strata_orm::Record> {
    let mut level = vec![project];
    for _ in 0..hops {
        level = level
            .into_iter()
            .flat_map(|p| p.loaded("users").and_then(Related::as_many).unwrap().iter())
            .map(|u| u.loaded("project").and_then(Related::as_one).unwrap())
            .collect();
    }
    level
}

#[tokio::test]
async fn test_default_depth_budget_allows_four_levels() {
    let (manager, _) = setup().await;
    assert_eq!(manager.config().max_eager_depth, 4);

    let projects = Project::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["users.project.users.project"])
        .all()
        .await
        .unwrap();
    let bottom = projects_below(projects.first().unwrap(), 2);
    assert_eq!(bottom.len(), 4);
    assert!(bottom.iter().all(|p| p.value("name").unwrap() == json!("Apollo")));

    // a fifth level is past the default budget
    let projects = Project::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["users.project.users.project.users"])
        .all()
        .await
        .unwrap();
    let bottom = projects_below(projects.first().unwrap(), 2);
    assert_eq!(bottom.len(), 4);
    assert!(bottom.iter().all(|p| !p.is_loaded("users")));
}

#[tokio::test]
async fn test_belongs_to_with_missing_keys() {
    let (manager, driver) = setup().await;
    Project::table(&manager).await.unwrap();
    User::table(&manager).await.unwrap();
    driver.reset();

    let users = User::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["project"])
        .all()
        .await
        .unwrap();
    assert_eq!(driver.queries(), 2);

    let names: Vec<Value> = users
        .iter()
        .map(|u| {
            u.loaded("project")
                .and_then(Related::as_one)
                .map(|p| p.value("name").unwrap())
                .unwrap_or(Value::Null)
        })
        .collect();
    assert_eq!(
        names,
        vec![
            json!("Apollo"),
            json!("Apollo"),
            json!("Gemini"),
            json!("Gemini"),
            Value::Null
        ]
    );
}

#[tokio::test]
async fn test_has_one_and_many_to_many() {
    let (manager, _) = setup().await;

    let users = User::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["profile", "tags"])
        .all()
        .await
        .unwrap();

    let profiles: Vec<bool> = users
        .iter()
        .map(|u| u.loaded("profile").and_then(Related::as_one).is_some())
        .collect();
    assert_eq!(profiles, vec![true, false, true, false, false]);

    let ada_tags = users
        .first()
        .and_then(|u| u.loaded("tags"))
        .and_then(Related::as_many)
        .unwrap()
        .field("label");
    let mut labels: Vec<Value> = ada_tags.into_vec();
    labels.sort_by_key(|v| v.to_string());
    assert_eq!(labels, vec![json!("rust"), json!("sql")]);

    // the pivot alias is not left on hydrated records
    let rust = users
        .first()
        .and_then(|u| u.loaded("tags"))
        .and_then(Related::as_many)
        .and_then(|tags| tags.first())
        .unwrap();
    assert!(rust.attributes().keys().all(|k| !k.starts_with("__")));

    let tags = Tag::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["users"])
        .all()
        .await
        .unwrap();
    let counts: Vec<Option<usize>> = tags.iter().map(|t| loaded_len(t, "users")).collect();
    assert_eq!(counts, vec![Some(2), Some(1)]);
}

#[tokio::test]
async fn test_constrained_relation() {
    let (manager, _) = setup().await;

    let projects = Project::find(&manager)
        .await
        .unwrap()
        .order_by("id")
        .with(["adults", "users"])
        .all()
        .await
        .unwrap();
    let apollo = projects.first().unwrap();
    assert_eq!(loaded_len(apollo, "users"), Some(2));
    assert_eq!(loaded_len(apollo, "adults"), Some(1));
}

#[tokio::test]
async fn test_load_on_single_record() {
    let (manager, _) = setup().await;

    let mut user = User::find_one(&manager, 3i64).await.unwrap().unwrap();
    assert!(!user.is_loaded("project"));
    user.load(&["project", "tags"]).await.unwrap();
    assert_eq!(
        user.loaded("project").and_then(Related::as_one).unwrap().value("name").unwrap(),
        json!("Gemini")
    );
    assert_eq!(loaded_len(&user, "tags"), Some(1));
}

#[tokio::test]
async fn test_unknown_relation_is_an_error() {
    let (manager, _) = setup().await;

    let result = Project::find(&manager).await.unwrap().with(["sponsors"]).all().await;
    match result {
        Err(ModelError::UnknownRelation { class, relation }) => {
            assert_eq!(class, "Project");
            assert_eq!(relation, "sponsors");
        }
        other => panic!("expected unknown relation, got {:?}", other),
    }
}
