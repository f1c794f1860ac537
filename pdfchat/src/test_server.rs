use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use std::{
    net::TcpListener,
    sync::{Arc, Mutex},
};

/// A request as seen by the local inference server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub type Requests = Arc<Mutex<Vec<Recorded>>>;

/// Serves `reply` for every POST on a random local port. Returns the base URL
/// and the log of received requests.
pub fn spawn<F>(reply: F) -> (String, Requests)
where
    F: Fn(&Value) -> Response + Clone + Send + Sync + 'static,
{
    let requests = Requests::default();
    let log = requests.clone();

    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, Json(body): Json<Value>| {
        let log = log.clone();
        let reply = reply.clone();

        async move {
            let response = reply(&body);
            log.lock().unwrap().push(Recorded {
                path: uri.path().to_string(),
                authorization: headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string),
                body,
            });

            response
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);

    (format!("http://{address}"), requests)
}

pub fn json(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

pub fn html(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}
