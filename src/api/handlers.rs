// src/api/handlers.rs

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::{types::*, ApiState};
use crate::plugins::context::RequestContext;
use crate::plugins::dispatch::{decode_site, site_info};

pub const NO_PLUGIN_MESSAGE: &str = "no plugin handled this site";

type Reply<T> = (StatusCode, Json<T>);

fn envelope<T>(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Reply<Envelope<T>> {
    (
        status,
        Json(Envelope {
            code: status.as_u16(),
            message: message.into(),
            data,
        }),
    )
}

fn scrape_reply(status: StatusCode, success: bool, message: &str) -> Reply<ScrapeResponse> {
    (
        status,
        Json(ScrapeResponse {
            success,
            message: message.to_string(),
            data: Vec::new(),
        }),
    )
}

/// POST /api/metadata/scrape — Route a captured page to every matching plugin.
pub async fn scrape(
    State(state): State<ApiState>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Reply<ScrapeResponse> {
    let Ok(Json(body)) = body else {
        return scrape_reply(StatusCode::BAD_REQUEST, false, "invalid request body");
    };
    if url::Url::parse(&body.site).is_err() {
        return scrape_reply(StatusCode::BAD_REQUEST, false, "site is not a valid URL");
    }

    let outcome = state.dispatcher.dispatch(&body.site, body.data).await;
    if !outcome.matched_any {
        return scrape_reply(StatusCode::OK, false, NO_PLUGIN_MESSAGE);
    }

    (
        StatusCode::OK,
        Json(ScrapeResponse {
            success: true,
            message: "success".into(),
            data: outcome
                .notifications
                .into_iter()
                .map(NotificationBody::from)
                .collect(),
        }),
    )
}

/// GET /api/plugin/config — Panels of every plugin that declares one.
pub async fn plugin_config(State(state): State<ApiState>) -> Json<Envelope<Vec<PluginPanelEntry>>> {
    let entries = state
        .dispatcher
        .catalog()
        .plugins
        .iter()
        .filter_map(|plugin| {
            let panel = plugin.handler.scripts()?;
            if panel.title.is_empty() {
                return None;
            }
            let controls = panel
                .controls
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    c.channel = ChannelKey::new(&plugin.name, &plugin.id, &c.channel).to_string();
                    c
                })
                .collect();
            Some(PluginPanelEntry {
                id: plugin.id.clone(),
                description: panel.description.clone().unwrap_or_else(|| panel.title.clone()),
                title: panel.title,
                controls,
            })
        })
        .collect();

    Json(Envelope {
        code: 200,
        message: "success".into(),
        data: Some(entries),
    })
}

/// POST /api/plugin/toggle — Run the trigger behind one panel control.
pub async fn plugin_toggle(
    State(state): State<ApiState>,
    body: Result<Json<ToggleRequest>, JsonRejection>,
) -> Reply<Envelope<serde_json::Value>> {
    let Ok(Json(body)) = body else {
        return envelope(StatusCode::BAD_REQUEST, "invalid request body", None);
    };
    let Some(key) = ChannelKey::parse(&body.channel) else {
        return envelope(StatusCode::BAD_REQUEST, "invalid channel format", None);
    };

    let catalog = state.dispatcher.catalog();
    let Some(plugin) = catalog
        .plugins
        .iter()
        .find(|p| p.id == body.id && p.name == key.plugin_name)
    else {
        return envelope(
            StatusCode::NOT_FOUND,
            format!("plugin not found: {}", body.id),
            None,
        );
    };

    let panel = plugin.handler.scripts().unwrap_or_default();
    let Some(control) = panel.control(&key.channel) else {
        return envelope(
            StatusCode::NOT_FOUND,
            format!("unknown channel: {}", key.channel),
            None,
        );
    };

    let url = decode_site(&body.context.site);
    let ctx = RequestContext {
        site: site_info(&url),
        data: body.context.data,
        utils: state.dispatcher.utils().clone(),
    };

    plugin
        .log
        .info(&format!("trigger {} ({})", key.channel, control.label));
    match plugin
        .handler
        .trigger(&key.channel, plugin.log.clone(), ctx)
        .await
    {
        Ok(result) => envelope(StatusCode::OK, "trigger succeeded", Some(result)),
        Err(e) => {
            plugin.log.error(&format!("trigger {} failed: {e:#}", key.channel));
            envelope(StatusCode::INTERNAL_SERVER_ERROR, "trigger failed", None)
        }
    }
}

/// GET /api/health — Simple health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
