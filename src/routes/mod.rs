use crate::config::rate_limit::{RateLimitConfig, RateLimitGroup};
use crate::handlers;
use crate::middleware::auth::session_middleware;
use crate::websocket;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> anyhow::Result<Router> {
    Ok(Router::new()
        .nest("/api/v1", api_routes(&RateLimitConfig::from_env())?)
        // Session feed (auth handled inside the handler via query token)
        .route(
            "/api/v1/ws/session",
            routing::get(websocket::session::ws_handler),
        ))
}

fn api_routes(rate_limit_config: &RateLimitConfig) -> anyhow::Result<Router> {
    let auth = auth_routes(rate_limit_config)?;
    let public = public_routes(rate_limit_config)?;
    let protected = protected_routes(rate_limit_config)?;

    // Every API route sees the caller's session if there is one; handlers
    // decide whether they need it.
    Ok(auth
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(session_middleware)))
}

/// Credential exchanges: signup, login, refresh.
fn auth_routes(config: &RateLimitConfig) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/auth/signup", routing::post(handlers::signup))
        .route("/auth/login", routing::post(handlers::login))
        .route("/auth/refresh", routing::post(handlers::refresh_token));

    with_optional_rate_limit(router, config, RateLimitGroup::Auth)
}

/// Open to guests. A guest's report submission is stored anonymously.
fn public_routes(config: &RateLimitConfig) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/auth/session", routing::get(handlers::session))
        .route("/reports", routing::post(handlers::report::create_report))
        .route(
            "/reports/track",
            routing::get(handlers::report::track_report),
        );

    with_optional_rate_limit(router, config, RateLimitGroup::Public)
}

/// Routes that act on the caller's session.
fn protected_routes(config: &RateLimitConfig) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/auth/logout", routing::post(handlers::logout))
        .route(
            "/reports/mine",
            routing::get(handlers::report::list_my_reports),
        );

    with_optional_rate_limit(router, config, RateLimitGroup::Protected)
}

fn with_optional_rate_limit(
    router: Router,
    config: &RateLimitConfig,
    group: RateLimitGroup,
) -> anyhow::Result<Router> {
    if !config.enabled {
        return Ok(router);
    }

    let rule = config.rule(group);
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration for {:?}", group))?;

    Ok(router.layer(GovernorLayer::new(governor_conf)))
}
