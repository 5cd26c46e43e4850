use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use teedrop::web::routes::api::tees::current_utc_month;

use crate::helpers::{tee, TestApp};

fn slugs(body: &Value) -> Vec<&str> {
    body.as_array()
        .map(|items| items.iter().filter_map(|i| i["slug"].as_str()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn current_returns_only_current_tees_of_the_month() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.insert_tee(tee("may-1", "2024-05", "current")).await?;
    app.insert_tee(tee("may-old", "2024-05", "archived")).await?;
    app.insert_tee(tee("june-1", "2024-06", "current")).await?;
    app.insert_tee(tee("may-2", "2024-05", "current")).await?;

    let res = app.get("/api/tees/current?month=2024-05").await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(slugs(&body), vec!["may-1", "may-2"]);

    Ok(())
}

#[tokio::test]
async fn current_defaults_to_the_current_utc_month() -> Result<()> {
    let app = TestApp::spawn().await?;
    let this_month = current_utc_month();
    app.insert_tee(tee("now", &this_month, "current")).await?;
    app.insert_tee(tee("then", "1999-01", "current")).await?;

    let body: Value = app.get("/api/tees/current").await?.json().await?;
    assert_eq!(slugs(&body), vec!["now"]);

    Ok(())
}

#[tokio::test]
async fn current_without_matches_returns_empty_list() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/api/tees/current?month=2030-01").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!([]));

    Ok(())
}

#[tokio::test]
async fn returned_tees_never_expose_the_internal_id() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.insert_tee(tee("a", "2024-05", "current")).await?;
    app.insert_tee(tee("b", "2024-04", "archived")).await?;

    for path in ["/api/tees/current?month=2024-05", "/api/tees/archive"] {
        let body: Value = app.get(path).await?.json().await?;
        let items = body.as_array().cloned().unwrap_or_default();
        assert_eq!(items.len(), 1, "path: {path}");
        assert!(items[0].get("_id").is_none(), "path: {path}");
        assert_eq!(items[0]["price"], json!(42.5));
        assert_eq!(items[0]["tags"], json!(["limited", "drop"]));
    }

    Ok(())
}

#[tokio::test]
async fn archive_honors_limit_and_defaults_to_24() -> Result<()> {
    let app = TestApp::spawn().await?;
    for i in 0..30 {
        app.insert_tee(tee(&format!("old-{i}"), "2023-01", "archived"))
            .await?;
    }
    app.insert_tee(tee("fresh", "2024-05", "current")).await?;

    let body: Value = app.get("/api/tees/archive").await?.json().await?;
    let archived = slugs(&body);
    assert_eq!(archived.len(), 24);
    assert!(!archived.contains(&"fresh"));

    let body: Value = app.get("/api/tees/archive?limit=5").await?.json().await?;
    assert_eq!(
        slugs(&body),
        vec!["old-0", "old-1", "old-2", "old-3", "old-4"]
    );

    let body: Value = app.get("/api/tees/archive?limit=100").await?.json().await?;
    assert_eq!(slugs(&body).len(), 30);

    let body: Value = app.get("/api/tees/archive?limit=0").await?.json().await?;
    assert_eq!(body, json!([]));

    Ok(())
}

#[tokio::test]
async fn archive_with_malformed_limit_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    for limit in ["abc", "-1"] {
        let res = app.get(&format!("/api/tees/archive?limit={limit}")).await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "limit: {limit}");

        let body: Value = res.json().await?;
        assert_eq!(body["error"]["kind"], "INVALID_INPUT");
    }

    Ok(())
}

#[tokio::test]
async fn invalid_stored_record_fails_the_request() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.insert_tee(tee("good", "2024-05", "current")).await?;
    let nameless = json!({"slug": "no-name", "release_month": "2024-05", "status": "current"});
    app.insert_tee(nameless).await?;

    let res = app.get("/api/tees/current?month=2024-05").await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["kind"], "SERVICE_ERROR");

    Ok(())
}

#[tokio::test]
async fn store_outage_returns_500_and_recovers() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.insert_tee(tee("a", "2024-05", "archived")).await?;
    app.store.set_available(false);

    let res = app.get("/api/tees/archive").await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let req_id = res
        .headers()
        .get("x-request-id")
        .and_then(|id| id.to_str().ok())
        .map(str::to_string);

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["kind"], "SERVICE_ERROR");
    assert!(body["detail"]
        .as_str()
        .is_some_and(|d| d.contains("store unavailable")));
    assert_eq!(
        body["error"]["req_id"].as_str().map(str::to_string),
        req_id
    );

    app.store.set_available(true);
    let res = app.get("/api/tees/archive").await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn current_store_outage_returns_500_and_recovers() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.insert_tee(tee("a", "2024-05", "current")).await?;
    app.store.set_available(false);

    let res = app.get("/api/tees/current?month=2024-05").await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["kind"], "SERVICE_ERROR");
    assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));

    app.store.set_available(true);
    let res = app.get("/api/tees/current?month=2024-05").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(slugs(&body), vec!["a"]);

    Ok(())
}
