//! Application router

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{any, get};
use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::ws::ws_handler;
use crate::config::{Config, UiDefaults};

const INDEX_TEMPLATE: &str = include_str!("../../res/index.html");

/// Create the application router
pub fn create_router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/ws", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

/// Subset of the configuration exposed to the UI
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexView<'a> {
    defaults: &'a UiDefaults,
    commands: Vec<&'a str>,
}

async fn index(State(config): State<Arc<Config>>) -> Html<String> {
    Html(render_index(&config))
}

fn render_index(config: &Config) -> String {
    let view = IndexView {
        defaults: &config.defaults,
        commands: config.commands.iter().map(|c| c.name.as_str()).collect(),
    };
    let json = serde_json::to_string(&view).unwrap_or_else(|_| "{}".to_string());
    INDEX_TEMPLATE.replace("__KVM_CONFIG__", &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_embeds_defaults_and_command_names() {
        let config = Config {
            defaults: UiDefaults {
                remote_video: true,
                keyboard: true,
                ..Default::default()
            },
            commands: vec![crate::config::CommandSpec {
                name: "Power cycle".to_string(),
                command: "echo power".to_string(),
            }],
            ..Default::default()
        };

        let page = render_index(&config);
        assert!(!page.contains("__KVM_CONFIG__"));
        assert!(page.contains(r#""remoteVideo":true"#));
        assert!(page.contains("Power cycle"));
        // The shell command itself never reaches the page
        assert!(!page.contains("echo power"));
    }
}
