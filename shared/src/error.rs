use lambda_http::{http::StatusCode, Body, Response};
use serde::Serialize;

/// Everything a request can fail with. Each variant is terminal for the
/// request that raised it; nothing is retried or queued.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthenticated,
    #[error("no account found for the authenticated identity")]
    AccountNotFound,
    #[error("role not permitted for this action")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("store operation failed: {0}")]
    Store(String),
    #[error("no doctors available for assignment")]
    NoDoctorsAvailable,
    #[error("{0}")]
    AuthProvider(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::AccountNotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NoDoctorsAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::AuthProvider(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "Unauthenticated",
            ApiError::AccountNotFound => "AccountNotFound",
            ApiError::Forbidden => "Forbidden",
            ApiError::Validation(_) => "ValidationFailure",
            ApiError::Store(_) => "StoreFailure",
            ApiError::NoDoctorsAvailable => "NoDoctorsAvailable",
            ApiError::AuthProvider(_) => "AuthenticationFailed",
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, lambda_http::Error> {
        if matches!(self, ApiError::Store(_)) {
            tracing::error!("store failure: {}", self);
        }
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        Ok(Response::builder()
            .status(self.status())
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&body)?.into())
            .map_err(Box::new)?)
    }
}

/// JSON success response with the CORS headers every endpoint carries.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AccountNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Store("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::NoDoctorsAvailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_body_shape() {
        let resp = ApiError::Forbidden.into_response().unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = match resp.body() {
            Body::Text(text) => text.clone(),
            _ => panic!("expected text body"),
        };
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["error"], "Forbidden");
    }
}
