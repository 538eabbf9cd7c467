//! # Mock Backend Integration Tests
//!
//! End-to-end behaviour of fixtures, auto-routing, collection stores and persistence
//! through the public router API.

use http::Method;
use mock_backend::{
    BackendConfig, FileSlot, MemorySlot, MockResponse, PersistenceSlot, Record, RouteTemplate,
    RouterBuilder, SeedOutcome,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn users_fixture() -> Vec<Record> {
    serde_json::from_value(json!([
        {
            "id": 1,
            "gender": "male",
            "name": {"title": "mr", "first": "terry", "last": "henry"},
            "picture": {"thumbnail": "http://api.randomuser.me/portraits/thumb/men/20.jpg"}
        },
        {
            "id": 2,
            "gender": "female",
            "name": {"title": "ms", "first": "pamela", "last": "jennings"},
            "picture": {"thumbnail": "http://api.randomuser.me/portraits/thumb/women/95.jpg"}
        },
        {
            "id": 3,
            "gender": "male",
            "name": {"title": "mr", "first": "nathaniel", "last": "clark"},
            "picture": {"thumbnail": "http://api.randomuser.me/portraits/thumb/men/17.jpg"}
        }
    ]))
    .unwrap()
}

fn ids(response: &MockResponse) -> Vec<i64> {
    response
        .body_items()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

/// Seeded collection with no explicit routes is fully served by generated routes
#[tokio::test]
async fn test_auto_routed_users_scenario() {
    let router = RouterBuilder::new()
        .fixture("users", users_fixture())
        .unwrap()
        .build()
        .unwrap();

    let list = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
    assert_eq!(list.status_code, 200);
    assert_eq!(ids(&list), vec![1, 2, 3]);

    let created = router
        .dispatch_parts(
            Method::POST,
            "/users",
            Some(r#"{"gender":"female","name":{"title":"ms","first":"ada","last":"byron"},"picture":{}}"#),
        )
        .await
        .unwrap();
    assert_eq!(created.status_code, 200);
    let item = created.body_item().unwrap();
    assert_eq!(item["id"], 4);
    assert_eq!(item["name"]["first"], "ada");

    let deleted = router.dispatch_parts(Method::DELETE, "/users/2", None).await.unwrap();
    assert_eq!(deleted.status_code, 200);
    assert_eq!(deleted.body_item().unwrap()["name"]["first"], "pamela");

    let list = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
    assert_eq!(ids(&list), vec![1, 3, 4]);

    let missing = router.dispatch_parts(Method::GET, "/users/2", None).await.unwrap();
    assert_eq!(missing.status_code, 404);
    assert_eq!(missing.body["error"]["code"], 404);
}

#[tokio::test]
async fn test_put_merges_and_query_string_is_ignored_for_matching() {
    let router = RouterBuilder::new()
        .fixture("users", users_fixture())
        .unwrap()
        .build()
        .unwrap();

    let updated = router
        .dispatch_parts(Method::PUT, "/users/1?notify=false", Some(r#"{"gender":"other"}"#))
        .await
        .unwrap();

    let item = updated.body_item().unwrap();
    assert_eq!(item["gender"], "other");
    assert_eq!(item["name"]["first"], "terry");
    assert_eq!(item["id"], 1);
}

#[tokio::test]
async fn test_client_supplied_id_is_rejected() {
    let router = RouterBuilder::new()
        .fixture("users", users_fixture())
        .unwrap()
        .build()
        .unwrap();

    let response = router
        .dispatch_parts(Method::POST, "/users", Some(r#"{"id": 5, "gender": "male"}"#))
        .await
        .unwrap();
    assert_eq!(response.status_code, 400);
    assert_eq!(response.status_text, "Bad Request");

    let list = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
    assert_eq!(ids(&list), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_explicit_routes_suppress_auto_routing() {
    let mut builder = RouterBuilder::new().fixture("users", users_fixture()).unwrap();
    let users = builder.collection("users");

    let router = builder
        .on_get("/users", move |_, _| {
            let mut response = users.find_all()?;
            response.headers.insert("x-custom".into(), "yes".into());
            Ok(response)
        })
        .unwrap()
        .build()
        .unwrap();

    let list = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
    assert_eq!(list.headers.get("x-custom").map(String::as_str), Some("yes"));
    assert_eq!(ids(&list), vec![1, 2, 3]);

    // No generated item route: the request falls through to the offline passthrough.
    let matched = router.match_route(&Method::GET, "/users/1").unwrap();
    assert!(matched.passthrough);
}

#[tokio::test]
async fn test_unmatched_requests_use_offline_passthrough() {
    let router = RouterBuilder::new().build().unwrap();

    let response = router.dispatch_parts(Method::GET, "/nowhere", None).await.unwrap();
    assert_eq!(response.status_code, 404);
    assert_eq!(response.body["error"]["message"], "no route for GET /nowhere");
}

/// Runtime edits survive an unchanged re-seed but not a changed one
#[tokio::test]
async fn test_reseeding_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backend.json");

    {
        let slot: Arc<dyn PersistenceSlot> = Arc::new(FileSlot::open(&path).unwrap());
        let router = RouterBuilder::with_storage(slot)
            .fixture("users", users_fixture())
            .unwrap()
            .build()
            .unwrap();
        router.dispatch_parts(Method::DELETE, "/users/3", None).await.unwrap();
    }

    {
        let slot: Arc<dyn PersistenceSlot> = Arc::new(FileSlot::open(&path).unwrap());
        let builder = RouterBuilder::with_storage(slot);
        assert_eq!(builder.set_initial_data("users", users_fixture()).unwrap(), SeedOutcome::Kept);

        let router = builder.build().unwrap();
        let list = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
        assert_eq!(ids(&list), vec![1, 2]);
    }

    {
        let mut changed = users_fixture();
        changed[0].insert("gender".to_string(), Value::from("unknown"));

        let slot: Arc<dyn PersistenceSlot> = Arc::new(FileSlot::open(&path).unwrap());
        let builder = RouterBuilder::with_storage(slot);
        assert_eq!(builder.set_initial_data("users", changed).unwrap(), SeedOutcome::Reseeded);

        let router = builder.build().unwrap();
        let list = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(list.body_items().unwrap()[0]["gender"], "unknown");
    }
}

#[tokio::test]
async fn test_failed_delete_does_not_write() {
    let slot = Arc::new(MemorySlot::new());
    let router = RouterBuilder::with_storage(slot.clone())
        .fixture("users", users_fixture())
        .unwrap()
        .build()
        .unwrap();
    let writes = slot.write_count();

    let response = router.dispatch_parts(Method::DELETE, "/users/42", None).await.unwrap();

    assert_eq!(response.status_code, 404);
    assert_eq!(slot.write_count(), writes);
}

#[tokio::test]
async fn test_anonymous_resource_is_not_persisted() {
    let slot = Arc::new(MemorySlot::new());
    let router = RouterBuilder::with_storage(slot.clone())
        .register_resource("/scratch", None, None)
        .unwrap()
        .build()
        .unwrap();

    let created = router
        .dispatch_parts(Method::POST, "/scratch", Some(r#"{"note":"temp"}"#))
        .await
        .unwrap();
    assert_eq!(created.body_item().unwrap()["id"], 1);
    assert!(slot.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_bootstrap_from_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("posts.json"),
        r#"[{"id": 1, "title": "hello"}, {"id": 2, "title": "world"}]"#,
    )
    .unwrap();
    let config_path = dir.path().join("backend.yaml");
    std::fs::write(
        &config_path,
        r#"
storage:
  backend: file
  path: state.json
fixtures:
  - key: posts
    path: posts.json
resources:
  - collection_path: /blog
    item_path: /blog/{year}/{id}
    name: posts
"#,
    )
    .unwrap();

    let config = BackendConfig::load_from_file(&config_path).await.unwrap();
    let router = config.bootstrap().await.unwrap().build().unwrap();

    let post = router.dispatch_parts(Method::GET, "/blog/2014/2", None).await.unwrap();
    assert_eq!(post.body_item().unwrap()["title"], "world");

    // Declaring /blog marks only the "blog" segment, so /posts is still auto-routed.
    let list = router.dispatch_parts(Method::GET, "/posts", None).await.unwrap();
    assert_eq!(ids(&list), vec![1, 2]);

    assert!(dir.path().join("state.json").exists());
}

#[test]
fn test_template_recovers_substituted_values() {
    let template = RouteTemplate::compile("/archive/{a}-{b}/view").unwrap();

    for (a, b) in [("2014", "07"), ("x", "y"), ("long-value", "z")] {
        let params = template.match_path(&format!("/archive/{}-{}/view", a, b)).unwrap();
        let recovered = format!("{}-{}", params["a"], params["b"]);
        assert_eq!(recovered, format!("{}-{}", a, b));
    }

    let params = template.match_path("/archive/2014-07/view").unwrap();
    assert_eq!(params["a"], "2014");
    assert_eq!(params["b"], "07");
}
