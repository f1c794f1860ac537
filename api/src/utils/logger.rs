use sentry::{types::Dsn, SessionMode};
use std::{borrow::Cow, env, str::FromStr};
use tracing::warn;
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub fn setup() -> sentry::ClientInitGuard {
    let dsn = env::var("SENTRY_DSN").ok().filter(|s| !s.is_empty());
    let parsed = dsn.as_deref().map(Dsn::from_str);

    let guard = sentry::init(sentry::ClientOptions {
        traces_sample_rate: 1.0,
        attach_stacktrace: true,
        session_mode: SessionMode::Request,
        release: Some(Cow::Borrowed(env!("STATIC_BUILD_DATE"))),
        dsn: parsed.as_ref().and_then(|d| d.as_ref().ok()).cloned(),
        ..sentry::ClientOptions::default()
    });

    tracing_subscriber::registry()
        .with(sentry_tracing::layer())
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "api=info,pdfchat=info,tower_http=info".into()),
            ),
        )
        .init();

    if let Some(Err(err)) = parsed {
        warn!("Ignoring invalid $SENTRY_DSN: {err}");
    }

    guard
}
