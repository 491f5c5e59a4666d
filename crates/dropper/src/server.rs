//! HTTP surface: shared state, routes, handlers, and the serve loop.
//!
//! Every route except `/_ping` sits behind the authentication middleware.
//! Handlers do their filesystem work on the blocking pool and surface
//! failures through [`ApiError`], which collapses path escapes and genuine
//! absence into the same 404.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as RoutePath, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::auth::{self, AuthMode};
use crate::files::{
    list_dir, search, Entry, Listing, ListingError, PathResolver, ResolveError, ShortNames,
};

/// Browsing page served at `/`, with the root path substituted in.
const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared, immutable per-process state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    /// Path confinement for every filesystem lookup.
    pub resolver: PathResolver,

    /// Startup-computed short download names.
    pub short_names: ShortNames,

    /// Authentication gate, open or guarded.
    pub auth: AuthMode,

    /// Rendered browsing page.
    index_html: String,
}

impl AppState {
    /// Canonicalize the root and build all startup state, including the
    /// short-name table.
    pub fn new(root: &Path, auth: AuthMode) -> Result<Self, ResolveError> {
        let resolver = PathResolver::new(root)?;
        let short_names = ShortNames::build(&resolver);
        let index_html = INDEX_HTML.replace(
            "__ROOT__",
            &html_escape(&resolver.root().display().to_string()),
        );

        Ok(Self {
            resolver,
            short_names,
            auth,
            index_html,
        })
    }
}

/// Errors a handler can surface to the client.
///
/// Path escapes, wrong-type targets, and genuine absence all collapse into
/// `NotFound`, so the response never reveals whether something exists
/// outside the root.
#[derive(Debug)]
pub enum ApiError {
    /// Uniform 404 for missing, wrong-type, and out-of-root paths.
    NotFound,

    /// Something failed server-side.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            ApiError::Internal(message) => {
                warn!("internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        debug!("path rejected: {}", err);
        ApiError::NotFound
    }
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        debug!("listing rejected: {}", err);
        ApiError::NotFound
    }
}

/// Query parameters for `/_ls`.
#[derive(Debug, Deserialize)]
struct LsParams {
    path: Option<String>,
}

/// Query parameters for `/_search`.
#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// `path` query handling: absent or the literal `.` mean the root.
fn normalize_rel(path: Option<&str>) -> String {
    match path {
        None => String::new(),
        Some(".") => String::new(),
        Some(p) => p.to_string(),
    }
}

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn ping() -> &'static str {
    "ok"
}

async fn ls(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LsParams>,
) -> Result<Json<Listing>, ApiError> {
    let resolver = state.resolver.clone();
    let rel = normalize_rel(params.path.as_deref());

    let listing = tokio::task::spawn_blocking(move || list_dir(&resolver, &rel))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(listing))
}

async fn search_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    let resolver = state.resolver.clone();

    let hits = tokio::task::spawn_blocking(move || search(&resolver, &params.q))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(hits))
}

async fn download(
    State(state): State<Arc<AppState>>,
    RoutePath(relpath): RoutePath<String>,
) -> Result<Response, ApiError> {
    serve_file(&state, &relpath).await
}

async fn download_redirect(uri: Uri) -> Result<Response, ApiError> {
    // Redirect with the still-encoded path so the target decodes identically
    let rest = uri.path().strip_prefix("/download/").unwrap_or_default();
    let location = HeaderValue::from_str(&format!("/dl/{}", rest))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

async fn drop_short(
    State(state): State<Arc<AppState>>,
    RoutePath(filename): RoutePath<String>,
) -> Result<Response, ApiError> {
    let relpath = match state.short_names.get(&filename) {
        Some(rel) => rel.to_string(),
        None => return Err(ApiError::NotFound),
    };

    serve_file(&state, &relpath).await
}

/// Stream one regular file back as an attachment.
async fn serve_file(state: &AppState, relpath: &str) -> Result<Response, ApiError> {
    let resolver = state.resolver.clone();
    let rel = relpath.to_string();
    let target = tokio::task::spawn_blocking(move || resolver.resolve(&rel))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let metadata = tokio::fs::metadata(&target)
        .await
        .map_err(|_| ApiError::NotFound)?;
    if !metadata.is_file() {
        return Err(ApiError::NotFound);
    }

    let file = tokio::fs::File::open(&target)
        .await
        .map_err(|_| ApiError::NotFound)?;

    let filename = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    let mime = mime_guess::from_path(&target).first_or_octet_stream();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.as_ref()).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped))
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}

/// Build the application router with every route and layer applied.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/_ls", get(ls))
        .route("/_search", get(search_files))
        .route("/dl/*relpath", get(download))
        .route("/download/*relpath", get(download_redirect))
        .route("/drop/:filename", get(drop_short))
        .route("/_ping", get(ping))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve requests on `listener` until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining connections");
}

/// Escape a string for embedding in HTML text content.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("a.txt"), "alpha").unwrap();
        fs::write(dir.join("sub/b.txt"), "bravo").unwrap();
    }

    fn open_state(root: &Path) -> Arc<AppState> {
        Arc::new(AppState::new(root, AuthMode::Open).unwrap())
    }

    #[test]
    fn test_normalize_rel() {
        assert_eq!(normalize_rel(None), "");
        assert_eq!(normalize_rel(Some(".")), "");
        assert_eq!(normalize_rel(Some("sub")), "sub");
        assert_eq!(normalize_rel(Some("sub/dir")), "sub/dir");
    }

    #[test]
    fn test_api_error_statuses() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("/plain/path"), "/plain/path");
        assert_eq!(html_escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[tokio::test]
    async fn test_ping_handler() {
        assert_eq!(ping().await, "ok");
    }

    #[tokio::test]
    async fn test_index_page_embeds_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let page = index_page(State(state.clone())).await;
        assert!(page.0.contains(&state.resolver.root().display().to_string()));
        assert!(!page.0.contains("__ROOT__"));
    }

    #[tokio::test]
    async fn test_ls_handler_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let Json(listing) = ls(State(state), Query(LsParams { path: None }))
            .await
            .unwrap();

        assert_eq!(listing.cwd, ".");
        assert_eq!(listing.dirs.len(), 1);
        assert_eq!(listing.dirs[0].name, "sub");
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "a.txt");
    }

    #[tokio::test]
    async fn test_ls_handler_dot_is_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let Json(listing) = ls(
            State(state),
            Query(LsParams {
                path: Some(".".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(listing.cwd, ".");
    }

    #[tokio::test]
    async fn test_ls_handler_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let result = ls(
            State(state),
            Query(LsParams {
                path: Some("missing".to_string()),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_ls_handler_traversal_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(&temp_dir.path().join("sub"));
        let result = ls(
            State(state),
            Query(LsParams {
                path: Some("../".to_string()),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_search_handler() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let Json(hits) = search_files(
            State(state),
            Query(SearchParams {
                q: "b".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].relpath, "sub/b.txt");
    }

    #[tokio::test]
    async fn test_search_handler_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let Json(hits) = search_files(
            State(state),
            Query(SearchParams { q: String::new() }),
        )
        .await
        .unwrap();

        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_download_handler_streams_attachment() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let response = download(State(state), RoutePath("sub/b.txt".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("attachment"));
        assert!(disposition.contains("b.txt"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"bravo");
    }

    #[tokio::test]
    async fn test_download_handler_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let result = download(State(state), RoutePath("sub".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_download_handler_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(&temp_dir.path().join("sub"));
        let result = download(State(state), RoutePath("../a.txt".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_drop_handler_resolves_short_name() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let response = drop_short(State(state), RoutePath("b.txt".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"bravo");
    }

    #[tokio::test]
    async fn test_drop_handler_unknown_name() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let state = open_state(temp_dir.path());
        let result = drop_short(State(state), RoutePath("nope.txt".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_download_redirect_points_at_dl() {
        let uri: Uri = "/download/sub/b.txt".parse().unwrap();
        let response = download_redirect(uri).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/dl/sub/b.txt"
        );
    }

    #[tokio::test]
    async fn test_download_redirect_keeps_encoding() {
        let uri: Uri = "/download/sub/with%20space.txt".parse().unwrap();
        let response = download_redirect(uri).await.unwrap();

        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/dl/sub/with%20space.txt"
        );
    }

    #[test]
    fn test_state_is_guarded_flag() {
        let temp_dir = TempDir::new().unwrap();
        let credential = Credential::from_env_value("u:p").unwrap();
        let state = AppState::new(temp_dir.path(), AuthMode::Guarded(credential)).unwrap();
        assert!(state.auth.is_guarded());
    }
}
