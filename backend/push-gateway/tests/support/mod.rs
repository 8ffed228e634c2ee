#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{dev::ServerHandle, web, App, HttpServer};
use crypto_core::jwt::HmacJwt;
use push_gateway::{handlers, metrics, AppState, ConnectionRegistry, Identity, JwtIdentityVerifier};

pub const SECRET: &str = "integration-test-secret";

pub fn test_state() -> AppState {
    let verifier = JwtIdentityVerifier::from_secret(SECRET).expect("verifier");
    AppState::new(ConnectionRegistry::new(), Arc::new(verifier))
}

pub async fn start_gateway(state: AppState) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(metrics::MetricsMiddleware)
            .configure(handlers::register_routes)
    })
    .workers(1)
    .listen(listener)?
    .run();

    let handle = server.handle();
    actix_rt::spawn(server);
    Ok((addr, handle))
}

pub fn issue_token(subject: i64) -> String {
    HmacJwt::new(SECRET)
        .expect("jwt")
        .issue(subject, Some("tester"), chrono::Duration::hours(1))
        .expect("token")
}

pub fn issue_expired_token(subject: i64) -> String {
    HmacJwt::new(SECRET)
        .expect("jwt")
        .issue(subject, None, chrono::Duration::hours(-1))
        .expect("token")
}

/// Poll until `check` holds for the registry, or give up after two seconds
pub async fn wait_for<F, Fut>(registry: &ConnectionRegistry, check: F) -> bool
where
    F: Fn(ConnectionRegistry) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check(registry.clone()).await {
            return true;
        }
        actix_rt::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

pub async fn wait_until_connected(registry: &ConnectionRegistry, identity: &str) -> bool {
    let identity = Identity::new(identity);
    wait_for(registry, |r| {
        let identity = identity.clone();
        async move { r.is_connected(&identity).await }
    })
    .await
}

pub async fn wait_until_disconnected(registry: &ConnectionRegistry, identity: &str) -> bool {
    let identity = Identity::new(identity);
    wait_for(registry, |r| {
        let identity = identity.clone();
        async move { !r.is_connected(&identity).await }
    })
    .await
}
