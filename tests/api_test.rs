// tests/api_test.rs — Integration test: HTTP routes over script plugins

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use siterelay::api::{build_router, ApiState};
use siterelay::plugins::{Dispatcher, PluginLoader};
use siterelay::utils::Utils;

const GALLERY: &str = r#"
fn on_request(ctx, log) {
    log.to_web("got " + ctx.data.len() + " items", "success");
}
fn scripts() {
    #{
        title: "Gallery tools",
        controls: [
            #{ "type": "button", label: "Count", channel: "count" },
            #{ "type": "button", label: "Break", channel: "break" },
        ],
    }
}
fn trigger(channel, log, ctx) {
    if channel == "break" { throw "broken on purpose"; }
    #{ items: ctx.data.len(), path: ctx.site.pathname }
}
"#;

const NOISY: &str = r#"
fn on_request(ctx, log) {
    log.to_web("noisy first");
    throw "noisy failed";
}
"#;

fn write_plugin(root: &Path, id: &str, manifest: Value, script: &str) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("plugin.json"), manifest.to_string()).unwrap();
    std::fs::write(dir.join("index.rhai"), script).unwrap();
}

fn app(root: &Path) -> Router {
    write_plugin(
        root,
        "gallery",
        json!({"name": "Gallery", "main": "index.rhai", "link-with": ["https://a.com/"]}),
        GALLERY,
    );
    write_plugin(
        root,
        "aaa-noisy",
        json!({"name": "Noisy", "main": "index.rhai", "link-with": ["https://a.com"]}),
        NOISY,
    );
    let catalog = Arc::new(PluginLoader::new(root).load());
    let dispatcher = Dispatcher::new(catalog, Utils::default());
    build_router(ApiState { dispatcher }, 1024 * 1024)
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let req = match body {
        Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn items() -> Value {
    json!([{"label": "title", "value": "x", "images": []}])
}

#[tokio::test]
async fn test_scrape_fans_out_and_collects() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = call(
        app(tmp.path()),
        "POST",
        "/api/metadata/scrape",
        Some(json!({"site": "https://a.com/post/1", "data": items()})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"],
        json!([
            {"pluginInfo": {"name": "Noisy"}, "info": "noisy first", "type": "info"},
            {"pluginInfo": {"name": "Gallery"}, "info": "got 1 items", "type": "success"},
        ])
    );
}

#[tokio::test]
async fn test_scrape_without_match() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = call(
        app(tmp.path()),
        "POST",
        "/api/metadata/scrape",
        Some(json!({"site": "https://b.com/", "data": items()})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "no plugin handled this site");
}

#[tokio::test]
async fn test_scrape_rejects_bad_bodies() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let (status, body) = call(
        app.clone(),
        "POST",
        "/api/metadata/scrape",
        Some(json!({"site": "not a url", "data": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        app,
        "POST",
        "/api/metadata/scrape",
        Some(json!({"data": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plugin_config_lists_panels() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = call(app(tmp.path()), "GET", "/api/plugin/config", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(
        body["data"],
        json!([{
            "id": "gallery",
            "title": "Gallery tools",
            "description": "Gallery tools",
            "controls": [
                {"type": "button", "label": "Count", "channel": "plugin:Gallery:gallery:count"},
                {"type": "button", "label": "Break", "channel": "plugin:Gallery:gallery:break"},
            ],
        }])
    );
}

fn toggle(channel: &str, id: &str) -> Value {
    json!({
        "type": "button",
        "channel": channel,
        "id": id,
        "context": {"data": items(), "site": "https://a.com/post/9"},
    })
}

#[tokio::test]
async fn test_toggle_runs_trigger() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = call(
        app(tmp.path()),
        "POST",
        "/api/plugin/toggle",
        Some(toggle("plugin:Gallery:gallery:count", "gallery")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"items": 1, "path": "/post/9"}));
}

#[tokio::test]
async fn test_toggle_error_statuses() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());

    let cases = [
        (toggle("bogus", "gallery"), StatusCode::BAD_REQUEST),
        (toggle("plugin:Gallery:gallery:count", "missing"), StatusCode::NOT_FOUND),
        (toggle("plugin:Other:gallery:count", "gallery"), StatusCode::NOT_FOUND),
        (toggle("plugin:Gallery:gallery:nope", "gallery"), StatusCode::NOT_FOUND),
        (toggle("plugin:Gallery:gallery:break", "gallery"), StatusCode::INTERNAL_SERVER_ERROR),
        (json!({"channel": "x"}), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        let (status, reply) = call(app.clone(), "POST", "/api/plugin/toggle", Some(body)).await;
        assert_eq!(status, expected);
        assert_eq!(reply["code"], expected.as_u16());
    }
}
