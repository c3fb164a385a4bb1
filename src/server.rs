use crate::backend::Backend;
use crate::config::AppConfig;
use crate::controllers::{health, ClientController, GatewayRequest, RelayController};
use crate::error::GatewayError;
use crate::middleware::parse_body;
use crate::routing::{self, Action, MountTable};
use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

pub const CORS_ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE";
pub const CORS_ALLOWED_HEADERS: &str = "Content-Type,Authorization";

/// Application state, immutable once the server starts
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub routes: Arc<MountTable>,
    pub client_controller: Arc<ClientController>,
    pub relay_controller: Arc<RelayController>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            config: Arc::new(config),
            routes: Arc::new(routing::gateway_mount_table()),
            client_controller: Arc::new(ClientController::new(Arc::clone(&backend))),
            relay_controller: Arc::new(RelayController::new(backend)),
        }
    }
}

/// Build the gateway application.
///
/// All routing goes through [`dispatch`]; the layers run outermost first:
/// tracing, CORS response headers, CORS, then body buffering and JSON parsing.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let body_limit = state.config.body_limit;

    Router::new()
        .fallback(dispatch)
        .layer(middleware::from_fn_with_state(body_limit, parse_body))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOWED_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the request against the mount table and run the bound action.
async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(matched) = state.routes.resolve(&method, &path) else {
        debug!(method = %method, path = %path, "No route matched");
        return GatewayError::NotFound.into_response();
    };

    debug!(
        method = %method,
        mount = matched.mount.display_prefix(),
        group = matched.group().name,
        action = ?matched.action,
        "Dispatching request"
    );

    let action = matched.action;
    let gateway_request = GatewayRequest::new(&matched, request);

    match action {
        Action::Health => health::health().await.into_response(),
        Action::RegisterClient => {
            state
                .client_controller
                .register_new_client(gateway_request)
                .await
        }
        Action::LoginClient => {
            state
                .client_controller
                .login_existing_client(gateway_request)
                .await
        }
        Action::Relay => state.relay_controller.relay(gateway_request).await,
    }
}

/// Start the web server
pub async fn start_server(config: AppConfig, backend: Arc<dyn Backend>) -> Result<()> {
    let addr = config.server.bind_addr();

    debug!(
        frontend_url = %config.frontend_url,
        backend_url = %config.backend_url,
        "Creating application state"
    );

    let state = AppState::new(config, backend);

    info!("Routes mounted:");
    for mount in state.routes.mounts() {
        info!("  {:<26} - {}", mount.display_prefix(), mount.group.name);
    }

    let app = create_app(state);

    debug!(address = %addr, "Binding TCP listener");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            let local_addr = listener.local_addr()?;
            info!("Midtier of Trade Marshals listening on {}", local_addr);
            listener
        }
        Err(e) => {
            error!(address = %addr, error = %e, "Failed to bind to address");
            return Err(e.into());
        }
    };

    match axum::serve(listener, app).await {
        Ok(_) => {
            info!("Server stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server error");
            Err(e.into())
        }
    }
}
