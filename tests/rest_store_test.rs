use httpmock::prelude::*;
use roster_sync::config::RosterConfig;
use roster_sync::domain::model::{NewClass, NewStudent};
use roster_sync::{ClassStore, ErrorKind, RestGateway, Status, StudentStore};
use serde_json::json;
use std::sync::Arc;

fn config_for(server: &MockServer) -> RosterConfig {
    RosterConfig::from_toml_str(&format!(
        r#"
[gateway]
base_url = "{}"
api_key = "anon-key"
access_token = "teacher-jwt"

[owner]
user_id = "teacher-1"

[stores]
operation_timeout_secs = 5
"#,
        server.base_url()
    ))
    .unwrap()
}

fn class_row(id: &str, name: &str, created_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "teacher-1",
        "name": name,
        "grade_level": "9",
        "subject": "Math",
        "academic_year": null,
        "school_id": null,
        "google_classroom_id": null,
        "created_at": created_at,
        "updated_at": created_at,
        "archived_at": null
    })
}

fn student_row(id: &str, name: &str, email: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "class_id": "class-1",
        "name": name,
        "email": email,
        "student_id": null,
        "google_id": null,
        "created_at": "2024-09-02T08:00:00.000000+00:00",
        "updated_at": "2024-09-02T08:00:00.000000+00:00"
    })
}

#[tokio::test]
async fn test_class_store_over_http() {
    let server = MockServer::start();
    let list_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/classes")
            .query_param("user_id", "eq.teacher-1")
            .query_param("archived_at", "is.null")
            .query_param("order", "created_at.desc");
        then.status(200).json_body(json!([
            class_row("c2", "Geometry", "2024-09-02T00:00:00+00:00"),
            class_row("c1", "Algebra", "2024-09-01T00:00:00+00:00")
        ]));
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/classes")
            .json_body(json!({
                "user_id": "teacher-1",
                "name": "Calculus",
                "grade_level": "12",
                "subject": "Math"
            }));
        then.status(201)
            .json_body(json!([class_row("c3", "Calculus", "2024-09-03T00:00:00+00:00")]));
    });

    let config = config_for(&server);
    let gateway = Arc::new(RestGateway::new(&config.gateway).unwrap());
    let store = ClassStore::new(gateway, config.owner.user_id.clone(), config.operation_timeout());

    store.fetch().await.unwrap();
    let created = store
        .create(&NewClass {
            name: "Calculus".to_string(),
            grade_level: "12".to_string(),
            subject: "Math".to_string(),
            academic_year: None,
        })
        .await
        .unwrap();

    list_mock.assert();
    create_mock.assert();
    assert_eq!(created.id, "c3");
    let ids: Vec<String> = store.state().entities.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec!["c3", "c2", "c1"]);
}

#[tokio::test]
async fn test_student_store_surfaces_http_conflict() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/students")
            .query_param("class_id", "eq.class-1");
        then.status(200)
            .json_body(json!([student_row("s1", "Test Student", Some("test@student.com"))]));
    });
    let conflict = server.mock(|when, then| {
        when.method(POST).path("/rest/v1/students");
        then.status(409).json_body(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"students_class_id_email_key\"",
            "details": "Key (class_id, email)=(class-1, test@student.com) already exists.",
            "hint": null
        }));
    });

    let config = config_for(&server);
    let gateway = Arc::new(RestGateway::new(&config.gateway).unwrap());
    let store = StudentStore::new(gateway, "class-1", config.operation_timeout());
    store.fetch().await.unwrap();

    let err = store
        .add_student(&NewStudent::from_form("class-1", "Another Student", "test@student.com", ""))
        .await
        .unwrap_err();

    conflict.assert();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    let state = store.state();
    assert_eq!(state.status, Status::Error);
    assert_eq!(state.len(), 1);
}

#[tokio::test]
async fn test_bulk_import_over_http_is_one_request() {
    let server = MockServer::start();
    let bulk = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/students")
            .header("Prefer", "return=representation")
            .json_body(json!([
                {"class_id": "class-1", "name": "Alice", "email": "alice@x.com", "student_id": "1"},
                {"class_id": "class-1", "name": "Carol", "student_id": "3"}
            ]));
        then.status(201).json_body(json!([
            student_row("s1", "Alice", Some("alice@x.com")),
            student_row("s2", "Carol", None)
        ]));
    });

    let config = config_for(&server);
    let gateway = Arc::new(RestGateway::new(&config.gateway).unwrap());
    let store = StudentStore::new(gateway, "class-1", config.operation_timeout());

    let summary = store
        .import_csv("Name,Email,ID\nAlice,alice@x.com,1\n,bob@x.com,2\nCarol,,3")
        .await
        .unwrap();

    bulk.assert_hits(1);
    assert_eq!(summary.inserted.len(), 2);
    assert_eq!(store.state().len(), 2);
}

#[tokio::test]
async fn test_rejected_bulk_import_leaves_list_unchanged() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/students");
        then.status(400).json_body(json!({
            "code": "23502",
            "message": "null value in column \"name\" violates not-null constraint",
            "details": null,
            "hint": null
        }));
    });

    let config = config_for(&server);
    let gateway = Arc::new(RestGateway::new(&config.gateway).unwrap());
    let store = StudentStore::new(gateway, "class-1", config.operation_timeout());

    let err = store
        .import_csv("Name,Email,ID\nAlice,,\nBob,,")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert!(store.state().is_empty());
    assert_eq!(store.state().status, Status::Error);
}
