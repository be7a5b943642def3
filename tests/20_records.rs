mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::{app, get, post_json, send, token_for, SpyBroker};

fn bearer() -> String {
    format!("Bearer {}", token_for(json!("42")))
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let (status, body) = send(app(SpyBroker::ok()), get("/", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Pet Journal API");
    Ok(())
}

#[tokio::test]
async fn health_reports_unreachable_database() -> Result<()> {
    let (status, body) = send(app(SpyBroker::ok()), get("/health", None)).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn record_routes_require_a_token() -> Result<()> {
    for path in ["/api/getPetList", "/api/getNoteList"] {
        let (status, _) = send(app(SpyBroker::ok()), get(path, None)).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
    }

    for path in [
        "/api/addPet",
        "/api/updatePet",
        "/api/deletePet",
        "/api/addNote",
        "/api/deleteNote",
    ] {
        let (status, body) = send(app(SpyBroker::ok()), post_json(path, None, json!({}))).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(body["error"], true);
    }
    Ok(())
}

#[tokio::test]
async fn add_pet_without_pet_is_bad_request() -> Result<()> {
    let (status, body) = send(
        app(SpyBroker::ok()),
        post_json("/api/addPet", Some(&bearer()), json!({})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn update_pet_without_id_is_rejected() -> Result<()> {
    let (status, body) = send(
        app(SpyBroker::ok()),
        post_json("/api/updatePet", Some(&bearer()), json!({ "pet": { "name": "Mochi" } })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["id"].is_string());
    Ok(())
}

#[tokio::test]
async fn delete_routes_require_an_id() -> Result<()> {
    for (path, body) in [
        ("/api/deletePet", json!({})),
        ("/api/deleteNote", json!({ "noteId": 0 })),
    ] {
        let (status, _) = send(app(SpyBroker::ok()), post_json(path, Some(&bearer()), body)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn database_outage_is_service_unavailable() -> Result<()> {
    let (status, body) = send(app(SpyBroker::ok()), get("/api/getPetList", Some(&bearer()))).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn malformed_body_uses_error_envelope() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/addPet")
        .header("authorization", bearer())
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;

    let (status, body) = send(app(SpyBroker::ok()), request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn body_without_json_content_type_is_invalid_json() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/addNote")
        .header("authorization", bearer())
        .body(Body::from(r#"{"note":{}}"#))?;

    let (status, body) = send(app(SpyBroker::ok()), request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn mistyped_field_is_invalid_json() -> Result<()> {
    let (status, body) = send(
        app(SpyBroker::ok()),
        post_json("/api/deletePet", Some(&bearer()), json!({ "petId": "seven" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}
