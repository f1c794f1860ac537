use anyhow::{bail, Result};
use axum::{extract::DefaultBodyLimit, Router};
use pdfchat::{Config, Pipeline};
use std::env;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    axum::{
        session::{self, RequestIdMaker},
        state::{self, AppState},
    },
    http::routes,
};

const REQUIRED_ENV_VARS: &[&str] = &["APP_KEY"];
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn create() -> Result<Router> {
    for var in REQUIRED_ENV_VARS {
        if env::var(var).is_err() {
            bail!("${var} not set");
        }
    }

    let key = env::var("APP_KEY")?;
    if key.len() < 64 {
        bail!("$APP_KEY must be at least 64 bytes long");
    }

    let config = Config::from_env()?;
    info!("Loaded configuration: {config:?}");

    Ok(router(
        state::create(Pipeline::from_config(&config)?),
        key.as_bytes(),
    ))
}

pub fn router(state: AppState, key: &[u8]) -> Router {
    Router::new()
        .merge(routes::mount())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(session::layer(key))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(RequestIdMaker::default()))
        .with_state(state)
}
