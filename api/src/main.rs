#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use ::axum::Server;
use dotenvy::dotenv;
use std::{env, net::SocketAddr, process};
use tracing::{error, info};

use crate::{axum::app, utils::logger};

mod axum;
mod http;
mod utils;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let _guard = logger::setup();

    let app = match app::create() {
        Ok(app) => app,
        Err(err) => {
            error!("Failed to start: {err:#}");
            process::exit(1);
        }
    };

    let address = SocketAddr::from((
        [0, 0, 0, 0],
        env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000),
    ));

    info!("📚 PDF chat started on http://{address}");
    if let Err(err) = Server::bind(&address)
        .serve(app.into_make_service())
        .await
    {
        error!("Server stopped: {err}");
        process::exit(1);
    }
}
