use crate::config::Config;
use crate::daemon::{SharedStatus, SyncStatus};
use crate::error::{Error, Result};
use crate::model::{CachedModel, ModelRegistry};
use axum::{
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
	Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
	config: Config,
	status: SharedStatus,
}

impl AppState {
	pub fn new(config: Config, status: SharedStatus) -> Self {
		Self { config, status }
	}
}

#[derive(Serialize)]
pub struct HealthResponse {
	pub status: String,
	pub cache_path: PathBuf,
	#[serde(flatten)]
	pub sync: SyncStatus,
}

#[derive(Serialize)]
pub struct ModelsResponse {
	pub models: Vec<CachedModel>,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, message) = match self {
			Error::InvalidManifest { .. } | Error::ConfigError(_) => {
				(StatusCode::BAD_REQUEST, self.to_string())
			}
			Error::SerializationError(_) | Error::IoError(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
			}
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
		};

		let body = Json(serde_json::json!({
			"error": message,
		}));

		(status, body).into_response()
	}
}

async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
	let sync = state.status.read().await.clone();

	Ok(Json(HealthResponse {
		status: "ok".to_string(),
		cache_path: state.config.cache_path.clone(),
		sync,
	}))
}

async fn models_handler(State(state): State<AppState>) -> Result<Json<ModelsResponse>> {
	let registry = ModelRegistry::load(&state.config)?;

	Ok(Json(ModelsResponse {
		models: registry.list_models().into_iter().cloned().collect(),
	}))
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/api/health", get(health_handler))
		.route("/api/models", get(models_handler))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// Binds the status listener up front so a bad address fails before the daemon starts.
pub async fn bind(addr: &str) -> Result<tokio::net::TcpListener> {
	tokio::net::TcpListener::bind(addr)
		.await
		.map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))
}

pub async fn serve(
	listener: tokio::net::TcpListener,
	state: AppState,
	mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
	let app = create_router(state);

	if let Ok(addr) = listener.local_addr() {
		tracing::info!("Starting status server on {}", addr);
	}

	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			while !*shutdown.borrow() {
				if shutdown.changed().await.is_err() {
					break;
				}
			}
		})
		.await
		.map_err(|e| Error::ConfigError(format!("Server error: {}", e)))?;

	Ok(())
}
