//! dev::server
//!
//! Static file servers for development and preview.
//!
//! - The **asset server** serves `public/` with permissive CORS, so the
//!   page compiled by `typst watch` can load scripts and styles from it.
//! - The **preview server** serves the built `dist/` under the deployment
//!   base (`/clreq/`), redirecting every other path there.

use std::net::SocketAddr;
use std::path::Path;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Errors from running a server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Router serving `public_dir` to any origin.
pub fn asset_router(public_dir: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
}

/// Router serving `dist_dir` under `base`.
///
/// `base` is a path such as `/clreq/`, or an absolute URL whose path is
/// used. Requests outside it get a `302 Found` pointing at `base`.
pub fn preview_router(dist_dir: &Path, base: &str) -> Router {
    let prefix = format!("/{}", base_path(base).trim_matches('/'));
    if prefix == "/" {
        return Router::new().fallback_service(ServeDir::new(dist_dir));
    }

    let location = format!("{}/", prefix);
    let redirect = move || {
        let location = location.clone();
        async move { (StatusCode::FOUND, [(header::LOCATION, location)]).into_response() }
    };
    Router::new()
        .nest_service(&prefix, ServeDir::new(dist_dir))
        .fallback(redirect)
}

/// Path component of a URL base.
pub fn base_path(base: &str) -> &str {
    match base.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => base,
    }
}

/// Bind `127.0.0.1:<port>`. Port 0 picks a free port.
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
        .await
        .map_err(|source| ServerError::Bind { port, source })
}

/// Serve `router` until the task is dropped.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .await
        .map_err(ServerError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    async fn spawn(router: Router) -> String {
        let listener = bind(0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, router));
        format!("http://{}", addr)
    }

    fn no_redirects() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[test]
    fn base_path_strips_origin() {
        assert_eq!(base_path("/clreq/"), "/clreq/");
        assert_eq!(base_path("https://example.org/clreq/"), "/clreq/");
        assert_eq!(base_path("https://deploy.example.org"), "/");
    }

    #[tokio::test]
    async fn preview_serves_dist_under_base() {
        let dist = TempDir::new().unwrap();
        fs::write(dist.path().join("index.html"), "<h1>clreq</h1>").unwrap();
        let url = spawn(preview_router(dist.path(), "/clreq/")).await;

        let body = no_redirects()
            .get(format!("{}/clreq/index.html", url))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "<h1>clreq</h1>");
    }

    #[tokio::test]
    async fn preview_redirects_other_paths() {
        let dist = TempDir::new().unwrap();
        let url = spawn(preview_router(dist.path(), "/clreq/")).await;

        let response = no_redirects()
            .get(format!("{}/elsewhere", url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/clreq/");
    }

    #[tokio::test]
    async fn assets_allow_any_origin() {
        let public = TempDir::new().unwrap();
        fs::write(public.path().join("main.js"), "console.log(1)").unwrap();
        let url = spawn(asset_router(public.path())).await;

        let response = no_redirects()
            .get(format!("{}/main.js", url))
            .header("Origin", "http://localhost:1234")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
