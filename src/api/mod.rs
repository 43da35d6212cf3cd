use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::organizer::{validator, Config, ConfigValidationError, Organizer, OrganizerStatus};
use crate::organizer::manager::LoadError;
use crate::utils::persist;

pub type OrganizerState = Arc<Organizer>;

/// The exposed command surface: an explicit route table mapping each
/// external command to its handler.
pub fn routes() -> Router<OrganizerState> {
    Router::new()
        .route("/config/validate", post(validate_config))
        .route("/organizer/config", post(load_config))
        .route("/organizer/drop", post(drop_config))
        .route("/organizer/drop-wait", post(drop_config_wait))
        .route("/organizer/status", get(organizer_status))
        .route("/organizer/hotkey", post(handle_hotkey))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
    #[error("{0}")]
    Internal(String),
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Validation(err) => ApiError::Validation(err),
            LoadError::Index(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(err)).into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
        }
    }
}

/// Organizer calls can block (validation probes the filesystem, drops can
/// wait on workers), so every handler hops to the blocking pool.
async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, ApiError> + Send + 'static,
) -> Result<T, ApiError> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}

async fn validate_config(
    Json(config): Json<Option<Config>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_blocking(move || {
        validator::validate_config(config.as_ref())?;
        Ok(Json(serde_json::json!({})))
    })
    .await
}

async fn load_config(
    State(organizer): State<OrganizerState>,
    Json(config): Json<Option<Config>>,
) -> Result<Json<OrganizerStatus>, ApiError> {
    run_blocking(move || {
        let Some(config) = config else {
            validator::validate_config(None)?;
            unreachable!("an absent config never validates");
        };
        let status = organizer.load_config(config.clone())?;
        if let Err(err) = persist::save_latest(&config) {
            warn!("failed to persist latest config: {err}");
        }
        Ok(Json(status))
    })
    .await
}

async fn drop_config(
    State(organizer): State<OrganizerState>,
) -> Result<Json<OrganizerStatus>, ApiError> {
    run_blocking(move || Ok(Json(organizer.drop_config()))).await
}

async fn drop_config_wait(
    State(organizer): State<OrganizerState>,
) -> Result<Json<OrganizerStatus>, ApiError> {
    run_blocking(move || Ok(Json(organizer.drop_config_wait()))).await
}

async fn organizer_status(
    State(organizer): State<OrganizerState>,
) -> Result<Json<OrganizerStatus>, ApiError> {
    run_blocking(move || Ok(Json(organizer.status()))).await
}

#[derive(Debug, Deserialize)]
struct HotkeyRequest {
    hotkey: String,
}

async fn handle_hotkey(
    State(organizer): State<OrganizerState>,
    Json(req): Json<HotkeyRequest>,
) -> Result<Json<OrganizerStatus>, ApiError> {
    run_blocking(move || Ok(Json(organizer.handle_hotkey(&req.hotkey)))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        routes().with_state(Arc::new(Organizer::new()))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_without_session_is_all_absent() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/organizer/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let status = body_json(response).await;
        assert!(status["config"].is_null());
        assert!(status["currentFile"].is_null());
        assert_eq!(status["currentFileIndex"], 0);
        assert_eq!(status["numFiles"], 0);
    }

    #[tokio::test]
    async fn test_validate_null_config_returns_keyed_errors() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/config/validate")
                    .header("content-type", "application/json")
                    .body(Body::from("null"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let errors = body_json(response).await;
        assert!(errors["errors"]["config"].is_string());
    }

    #[tokio::test]
    async fn test_validate_accepts_valid_config() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), "x").unwrap();
        let dst = tempfile::tempdir().unwrap();

        let config = serde_json::json!({
            "id": 1,
            "name": "test",
            "src": {
                "dir": src.path(),
                "includeSubdirs": false,
                "defaultOpType": "copy",
            },
            "dst": { "dirs": [{ "hotkey": "a", "dir": dst.path() }] },
            "ops": { "numWorkers": 1, "maxTries": 1 },
        });

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/config/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(config.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_hotkey_without_session_is_a_noop() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/organizer/hotkey")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"hotkey":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["config"].is_null());
    }
}
