use async_session::CookieStore;
use axum::http::Request;
use axum_sessions::{PersistencePolicy, SameSite, SessionLayer};
use std::time::Duration;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const CONVERSATION_KEY: &str = "conversation_id";
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24);

pub fn layer(key: &[u8]) -> SessionLayer<CookieStore> {
    SessionLayer::new(CookieStore {}, key)
        .with_cookie_name("pdfchat_session")
        .with_same_site_policy(SameSite::Lax)
        .with_persistence_policy(PersistencePolicy::ChangedOnly)
        .with_session_ttl(Some(SESSION_TTL))
}

#[derive(Clone, Default)]
pub struct RequestIdMaker {}

impl MakeRequestId for RequestIdMaker {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}
