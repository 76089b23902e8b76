//! HTTP server setup and routing

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::routes::{self, decode_segment, path_param, RouteRequest};
use crate::services::{error_response, method_not_allowed, no_content, not_found, Services};
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub listen: SocketAddr,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(listen: SocketAddr, services: Arc<Services>) -> Self {
        Self { listen, services }
    }
}

/// Bind the configured address and serve until the task is dropped
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.listen).await?;
    info!("Catalog explorer listening on {}", state.listen);
    serve(listener, state).await
}

/// Accept connections on an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let if_none_match = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    let route_req = RouteRequest::new(req.uri().query(), if_none_match);

    Ok(dispatch(&state, &method, &path, &route_req).await)
}

const ROUTES: &[&str] = &[
    "/health",
    "/domains",
    "/domains-filtered",
    "/objectives",
    "/objectives-filtered",
    "/tools",
    "/tools-filtered",
    "/tools/categories",
    "/graph",
    "/table",
    "/facets",
];

fn is_known_path(path: &str) -> bool {
    ROUTES.contains(&path)
        || ["/objectives/", "/tools/", "/practices/"]
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

/// Route one request. Every response carries the CORS origin header.
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    req: &RouteRequest,
) -> Response<Full<Bytes>> {
    let mut response = match (method, path) {
        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        (&Method::GET, "/health") => routes::health_check(state),

        (&Method::GET, "/domains") => routes::handle_domains(state, req),
        (&Method::GET, "/domains-filtered") => routes::handle_domains_filtered(state, req),

        (&Method::GET, "/objectives") => routes::handle_objectives(state, req),
        (&Method::GET, "/objectives-filtered") => routes::handle_objectives_filtered(state, req),
        (&Method::GET, p) if p.starts_with("/objectives/") => {
            let rest = path_param(p, "/objectives/").unwrap_or("");
            match rest.strip_suffix("/practices") {
                Some(id) => with_path_id(id, |id| routes::handle_practices(state, req, id)),
                None if rest.contains('/') => not_found_response(p),
                None => with_path_id(rest, |id| routes::handle_objective(state, req, id)),
            }
        }

        (&Method::GET, p) if p.starts_with("/practices/") => {
            let rest = path_param(p, "/practices/").unwrap_or("");
            match rest.strip_suffix("/activities") {
                Some(id) => with_path_id(id, |id| routes::handle_activities(state, req, id)),
                None => not_found_response(p),
            }
        }

        (&Method::GET, "/tools") => routes::handle_tools(state, req),
        (&Method::GET, "/tools-filtered") => routes::handle_tools_filtered(state, req),
        (&Method::GET, "/tools/categories") => routes::handle_tool_categories(state, req),
        (&Method::GET, p) if p.starts_with("/tools/") => {
            let id = path_param(p, "/tools/").unwrap_or("");
            if id.contains('/') {
                not_found_response(p)
            } else {
                with_path_id(id, |id| routes::handle_tool(state, req, id))
            }
        }

        (&Method::GET, "/graph") => routes::handle_graph(state, req),
        (&Method::GET, "/table") => routes::handle_table(state, req),
        (&Method::GET, "/facets") => routes::handle_facets(state, req).await,

        (_, p) if is_known_path(p) => method_not_allowed(),
        (_, p) => not_found_response(p),
    };

    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Call `handler` with the decoded path id, or answer 400 when it does not decode
fn with_path_id<F>(raw: &str, handler: F) -> Response<Full<Bytes>>
where
    F: FnOnce(&str) -> Response<Full<Bytes>>,
{
    match decode_segment(raw) {
        Ok(id) => handler(&id),
        Err(e) => error_response(e),
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = no_content();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    not_found(&format!("No route for {}", path))
}
