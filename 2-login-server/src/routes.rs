use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Verification};

pub type SharedStore = Arc<dyn CredentialStore>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /api/login`, reachable from any origin.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

async fn login(
    State(store): State<SharedStore>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable login body");
            return error(StatusCode::BAD_REQUEST, "Email and password are required");
        }
    };
    let email = request.email.filter(|email| !email.is_empty());
    let password = request.password.filter(|password| !password.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return error(StatusCode::BAD_REQUEST, "Email and password are required");
    };

    match store.verify(&email, &password) {
        Verification::Accepted => {
            info!(%email, "login accepted");
            (
                StatusCode::OK,
                Json(json!({ "message": "Login successful" })),
            )
                .into_response()
        }
        Verification::WrongSecret => {
            warn!(%email, "login rejected: wrong password");
            error(StatusCode::UNAUTHORIZED, "Invalid password")
        }
        Verification::UnknownIdentifier => {
            warn!(%email, "login rejected: unknown user");
            error(StatusCode::NOT_FOUND, "User not found")
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
