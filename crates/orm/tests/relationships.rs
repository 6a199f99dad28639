mod common;

use common::*;
use serde_json::{json, Value};
use strata_orm::{ActiveRecord, Related, RelationshipType};

#[tokio::test]
async fn test_batch_find_gives_every_key_a_slot() {
    let (manager, driver) = setup().await;
    let project = Project::find_one(&manager, 1i64).await.unwrap().unwrap();
    let relationship = project.relation("users").await.unwrap();
    assert_eq!(relationship.relationship_type(), RelationshipType::HasMany);
    assert_eq!(relationship.near_key(), "id");
    assert_eq!(relationship.far_key(), "users.project_id");

    driver.reset();
    let found = relationship
        .find(&[json!(1), json!(3), json!(99), Value::Null, json!(1)])
        .await
        .unwrap();
    assert_eq!(driver.queries(), 1);

    assert_eq!(found.len(), 3);
    assert_eq!(found["1"].len(), 2);
    assert!(found["3"].as_many().unwrap().is_empty());
    assert!(found["99"].is_empty());
}

#[tokio::test]
async fn test_batch_find_without_keys_skips_the_query() {
    let (manager, driver) = setup().await;
    let project = Project::find_one(&manager, 1i64).await.unwrap().unwrap();
    let relationship = project.relation("users").await.unwrap();

    driver.reset();
    let found = relationship.find(&[Value::Null]).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(driver.queries(), 0);
}

#[tokio::test]
async fn test_singular_find_keeps_one_record_per_key() {
    let (manager, _) = setup().await;
    let user = User::find_one(&manager, 1i64).await.unwrap().unwrap();
    let relationship = user.relation("project").await.unwrap();
    assert_eq!(relationship.near_key(), "project_id");

    let found = relationship.find(&[json!(1), json!(2), json!(42)]).await.unwrap();
    assert_eq!(found["1"].as_one().unwrap().value("name").unwrap(), json!("Apollo"));
    assert_eq!(found["2"].as_one().unwrap().value("name").unwrap(), json!("Gemini"));
    assert!(matches!(found["42"], Related::One(None)));
}

#[tokio::test]
async fn test_fetch_with_null_key_runs_no_query() {
    let (manager, driver) = setup().await;
    let mut barbara = User::find_one(&manager, 5i64).await.unwrap().unwrap();

    driver.reset();
    assert_eq!(barbara.get("project").await.unwrap(), Value::Null);
    assert_eq!(driver.queries(), 0);
    assert!(barbara.is_loaded("project"));
}

#[tokio::test]
async fn test_get_resolves_relations_by_any_spelling() {
    let (manager, _) = setup().await;
    let mut project = Project::find_one(&manager, 2i64).await.unwrap().unwrap();

    let users = project.get("users").await.unwrap();
    assert_eq!(users.as_array().map(Vec::len), Some(2));

    assert_eq!(project.get("displayName").await.unwrap(), json!("Project Gemini"));
    assert_eq!(project.value("display_name").unwrap(), json!("Project Gemini"));
}

#[tokio::test]
async fn test_unloaded_relation_needs_async_access() {
    let (manager, _) = setup().await;
    let project = Project::find_one(&manager, 2i64).await.unwrap().unwrap();
    assert!(project.value("users").is_err());
}

#[tokio::test]
async fn test_ad_hoc_relationship_builders() {
    let (manager, _) = setup().await;
    let user = User::find_one(&manager, 1i64).await.unwrap().unwrap();

    let project = user.belongs_to::<Project>(None, None).await.unwrap().with_key(json!(1));
    let related = project.fetch().await.unwrap();
    assert_eq!(related.as_one().unwrap().value("name").unwrap(), json!("Apollo"));

    let profile = user
        .has_one::<Profile>(Some("user_id"), Some("id"))
        .await
        .unwrap()
        .with_key(json!(1));
    assert_eq!(profile.fetch().await.unwrap().len(), 1);

    let tags = user
        .has_and_belongs_to_many::<Tag>(Some("tags_users"), Some(("user_id", "tag_id")))
        .await
        .unwrap();
    let association = tags.association().unwrap();
    assert_eq!(association.table, "tags_users");
    assert_eq!(tags.fetch().await.unwrap().len(), 2);

    let narrowed = user
        .has_and_belongs_to_many::<Tag>(None, None)
        .await
        .unwrap()
        .constrain(|t| t.where_eq("label", "sql"));
    let labels = narrowed.fetch().await.unwrap().as_many().unwrap().field("label");
    assert_eq!(labels.into_vec(), vec![json!("sql")]);
}

#[tokio::test]
async fn test_has_many_from_ad_hoc_builder_matches_declared() {
    let (manager, _) = setup().await;
    let project = Project::find_one(&manager, 1i64).await.unwrap().unwrap();

    let declared = project.relation("users").await.unwrap().fetch().await.unwrap();
    let ad_hoc = project.has_many::<User>(None, None).await.unwrap().fetch().await.unwrap();
    assert_eq!(declared.len(), ad_hoc.len());
}

#[tokio::test]
async fn test_save_clears_cached_relations() {
    let (manager, _) = setup().await;
    let mut user = User::find_one(&manager, 2i64).await.unwrap().unwrap();

    user.related("project").await.unwrap();
    assert!(user.is_loaded("project"));

    user.set("project_id", json!(2)).unwrap();
    user.save().await.unwrap();
    assert!(!user.is_loaded("project"));
    assert_eq!(
        user.related("project").await.unwrap().as_one().unwrap().value("name").unwrap(),
        json!("Gemini")
    );
}
