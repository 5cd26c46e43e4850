use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use teedrop::StoreInfo;

use crate::helpers::{tee, TestApp};

#[tokio::test]
async fn diagnostics_reports_connected_store_and_collections() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.insert_tee(tee("a", "2024-05", "current")).await?;

    let res = app.get("/test").await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["backend"], "running");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["connection_status"], "connected");
    assert_eq!(body["database_url"], "not set");
    assert_eq!(body["database_name"], "not set");
    assert_eq!(body["collections"], json!(["tee"]));

    Ok(())
}

#[tokio::test]
async fn diagnostics_still_answers_when_store_is_down() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.store.set_available(false);

    let res = app.get("/test").await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["backend"], "running");
    assert_eq!(body["connection_status"], "not connected");
    let database = body["database"].as_str().unwrap_or_default();
    assert!(database.starts_with("error: "), "got: {database}");
    assert!(database.chars().count() <= "error: ".len() + 50);
    assert_eq!(body["collections"], json!([]));

    Ok(())
}

#[tokio::test]
async fn diagnostics_reports_which_store_variables_are_set() -> Result<()> {
    let app = TestApp::spawn_with_store_info(StoreInfo {
        url_configured: true,
        name_configured: false,
    })
    .await?;

    let body: Value = app.get("/test").await?.json().await?;
    assert_eq!(body["database_url"], "set");
    assert_eq!(body["database_name"], "not set");

    Ok(())
}
