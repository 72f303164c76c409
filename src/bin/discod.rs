//! `discod` serves the HTTP dashboard: a small generated index page plus
//! cue and chase trigger endpoints, backed by the same composed pipeline
//! the CLI uses.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use disco::cmd::{Cmd, Cmdr};
use disco::config::Config;
use disco::system::System;
use rust_embed::RustEmbed;
use std::sync::Arc;

#[derive(RustEmbed)]
#[folder = "web/"]
struct Assets;

#[derive(Parser)]
#[command(name = "discod", about = "The disco HTTP dashboard")]
struct Cli {
    /// Path to config file.
    #[arg(short = 'c', long = "config", default_value = "/etc/disco.yml")]
    config: String,

    /// Listen address.
    #[arg(short = 'l', long = "listen", default_value = "0.0.0.0:80")]
    listen: String,
}

struct AppState {
    cmdr: Arc<dyn Cmdr>,
    chaser: Arc<disco::chaser::Chaser>,
    config: Config,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let system = match System::new(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let mut chaser_errs = system.chaser_errs;
    tokio::spawn(async move {
        while let Some(e) = chaser_errs.recv().await {
            log::error!("{e}");
        }
    });

    let state = Arc::new(AppState {
        cmdr: system.cmdr,
        chaser: system.chaser,
        config: cfg,
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/cue/*name", post(trigger_cue))
        .route("/chase/*name", post(trigger_chase))
        .route("/*path", get(asset))
        .with_state(state);

    log::info!("listening on {}", cli.listen);
    let listener = match tokio::net::TcpListener::bind(&cli.listen).await {
        Ok(l) => l,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        log::error!("{e}");
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state).await)
}

async fn render_index(state: &AppState) -> String {
    let chasing = state.chaser.chasing().await;

    let mut cues = String::new();
    for (name, cue) in &state.config.cue {
        cues.push_str(&format!(
            "<li><form action=\"/cue/{name}\" method=\"post\"><button>{}</button></form></li>\n",
            html_escape(&cue.text)
        ));
    }

    let mut chases = String::new();
    for (name, chase) in &state.config.chase {
        let running = chasing.contains(name);
        let action = if running {
            format!("/chase/{name}/stop")
        } else {
            format!("/chase/{name}")
        };
        let class = if running { " class=\"chasing\"" } else { "" };
        chases.push_str(&format!(
            "<li><form action=\"{action}\" method=\"post\"><button{class}>{}</button></form></li>\n",
            html_escape(&chase.text)
        ));
    }

    let mut sheets = String::new();
    for sheet in &state.config.sheet {
        sheets.push_str(&format!("<li>{}</li>\n", html_escape(&sheet.text)));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>disco</title>
  <link rel="stylesheet" href="/disco.css">
</head>
<body>
  <h1>disco</h1>
  <h2>cues</h2>
  <ul>{cues}</ul>
  <h2>chases</h2>
  <ul>{chases}</ul>
  <h2>sheets</h2>
  <ul>{sheets}</ul>
</body>
</html>
"#
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

async fn trigger_cue(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let cmd = Cmd::new("cue", name, Vec::new());
    match state.cmdr.cmd(vec![cmd]).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}")).into_response(),
    }
}

async fn trigger_chase(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    if let Some(chase) = name.strip_suffix("/stop") {
        state.chaser.stop(chase).await;
    } else {
        state.chaser.chase(&name).await;
    }
    Redirect::to("/").into_response()
}

async fn asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    match Assets::get(path) {
        Some(file) => ([(header::CONTENT_TYPE, content_type_for(path))], file.data.into_owned()).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("css") => "text/css",
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("ttf") => "font/ttf",
        _ => "application/octet-stream",
    }
}
