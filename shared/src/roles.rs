use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::error::json_response;
use crate::store::Store;

/// GET /roles: the dynamic role allow-list. Entries are data, not code;
/// new roles can appear without a redeploy.
pub async fn list_roles(store: &Store<'_>) -> Result<Response<Body>, Error> {
    match store.role_allowlist().await {
        Ok(roles) => json_response(StatusCode::OK, &serde_json::json!({ "roles": roles })),
        Err(e) => e.into_response(),
    }
}
