use aws_sdk_cognitoidentityprovider::types::AuthFlowType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use lambda_http::{http::StatusCode, Body, Error, Request, Response};
use sha2::Sha256;

use crate::error::{json_response, ApiError};
use crate::store::Store;
use crate::types::{Account, LoginRequest, RefreshRequest, SessionTokens};

type HmacSha256 = Hmac<Sha256>;

/// Compute the SECRET_HASH for Cognito authentication
pub(crate) fn compute_secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let message = format!("{}{}", username, client_id);
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    general_purpose::STANDARD.encode(result.into_bytes())
}

/// Bearer token from the Authorization header, if any.
fn bearer_token(event: &Request) -> Option<&str> {
    event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Resolve a bearer access token to the Cognito sub, which is the account
/// identifier everywhere else in the system.
pub async fn verify_bearer(cognito: &CognitoClient, event: &Request) -> Result<String, ApiError> {
    let token = bearer_token(event).ok_or(ApiError::Unauthenticated)?;
    sub_for_token(cognito, token).await
}

async fn sub_for_token(cognito: &CognitoClient, access_token: &str) -> Result<String, ApiError> {
    let result = cognito
        .get_user()
        .access_token(access_token)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!("Token verification failed: {:?}", e);
            ApiError::Unauthenticated
        })?;

    result
        .user_attributes()
        .iter()
        .find(|attr| attr.name() == "sub")
        .and_then(|attr| attr.value())
        .map(|sub| sub.to_string())
        .ok_or(ApiError::Unauthenticated)
}

/// Verify the bearer token and load the requester's account row.
pub async fn authenticate(
    cognito: &CognitoClient,
    store: &Store<'_>,
    event: &Request,
) -> Result<Account, ApiError> {
    let account_id = verify_bearer(cognito, event).await?;
    store
        .get_account(&account_id)
        .await?
        .ok_or(ApiError::AccountNotFound)
}

/// Exchange email/password for session tokens with Cognito.
pub(crate) async fn password_grant(
    cognito: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    email: &str,
    password: &str,
) -> Result<SessionTokens, ApiError> {
    let secret_hash = compute_secret_hash(email, client_id, client_secret);

    let response = cognito
        .initiate_auth()
        .auth_flow(AuthFlowType::UserPasswordAuth)
        .client_id(client_id)
        .auth_parameters("USERNAME", email)
        .auth_parameters("PASSWORD", password)
        .auth_parameters("SECRET_HASH", &secret_hash)
        .send()
        .await
        .map_err(|e| {
            let error_message = format!("{:?}", e);
            tracing::error!("Cognito authentication error: {}", error_message);
            ApiError::AuthProvider(friendly_auth_message(&error_message))
        })?;

    let auth_result = response
        .authentication_result()
        .ok_or_else(|| ApiError::AuthProvider("No authentication result returned".to_string()))?;

    Ok(SessionTokens {
        access_token: auth_result.access_token().unwrap_or_default().to_string(),
        refresh_token: auth_result.refresh_token().unwrap_or_default().to_string(),
        expires_in: auth_result.expires_in(),
    })
}

/// Extract a user-friendly message from a Cognito error dump.
fn friendly_auth_message(error_message: &str) -> String {
    if error_message.contains("NotAuthorizedException") {
        "Incorrect email or password".to_string()
    } else if error_message.contains("UserNotConfirmedException") {
        "Please verify your email before logging in".to_string()
    } else if error_message.contains("UserNotFoundException") {
        "No account found with this email".to_string()
    } else if error_message.contains("PasswordResetRequiredException") {
        "Password reset required".to_string()
    } else if error_message.contains("TooManyRequestsException") {
        "Too many login attempts. Please try again later".to_string()
    } else {
        "Login failed. Please check your credentials".to_string()
    }
}

/// Handle user login: authenticate with Cognito, then return the session
/// tokens together with the full usuario row.
pub async fn login(
    cognito: &CognitoClient,
    store: &Store<'_>,
    client_id: &str,
    client_secret: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    tracing::info!("Login request received");

    let login_request: LoginRequest = match serde_json::from_str(crate::body_text(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            return ApiError::Validation(format!("Invalid request body: {}", e)).into_response();
        }
    };

    tracing::info!("Authenticating user: {}", login_request.email);

    let tokens = match password_grant(
        cognito,
        client_id,
        client_secret,
        &login_request.email,
        &login_request.password,
    )
    .await
    {
        Ok(tokens) => tokens,
        Err(e) => return e.into_response(),
    };

    // Resolve the token to the sub so the account row can be attached.
    let account = match account_for_token(cognito, store, &tokens.access_token).await {
        Ok(account) => account,
        Err(e) => return e.into_response(),
    };

    tracing::info!("Authentication successful for user: {}", login_request.email);

    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "access_token": tokens.access_token,
            "refresh_token": tokens.refresh_token,
            "expires_in": tokens.expires_in,
            "usuario": account,
        }),
    )
}

pub(crate) async fn account_for_token(
    cognito: &CognitoClient,
    store: &Store<'_>,
    access_token: &str,
) -> Result<Account, ApiError> {
    let sub = sub_for_token(cognito, access_token).await?;
    store
        .get_account(&sub)
        .await?
        .ok_or(ApiError::AccountNotFound)
}

/// Exchange a refresh token for fresh session tokens.
pub async fn refresh_token(
    cognito: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    let request: RefreshRequest = match serde_json::from_str(crate::body_text(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            return ApiError::Validation(format!("Invalid request body: {}", e)).into_response();
        }
    };

    let secret_hash = compute_secret_hash(&request.email, client_id, client_secret);

    let response = cognito
        .initiate_auth()
        .auth_flow(AuthFlowType::RefreshTokenAuth)
        .client_id(client_id)
        .auth_parameters("REFRESH_TOKEN", &request.refresh_token)
        .auth_parameters("SECRET_HASH", &secret_hash)
        .send()
        .await;

    match response {
        Ok(response) => {
            let Some(auth_result) = response.authentication_result() else {
                return ApiError::AuthProvider("No authentication result returned".to_string())
                    .into_response();
            };
            // Cognito does not rotate the refresh token on this flow.
            let tokens = SessionTokens {
                access_token: auth_result.access_token().unwrap_or_default().to_string(),
                refresh_token: auth_result
                    .refresh_token()
                    .unwrap_or(&request.refresh_token)
                    .to_string(),
                expires_in: auth_result.expires_in(),
            };
            json_response(StatusCode::OK, &tokens)
        }
        Err(e) => {
            tracing::error!("Cognito refresh error: {:?}", e);
            ApiError::AuthProvider("Session refresh failed".to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_secret_hash_known_answer() {
        let hash = compute_secret_hash("user@example.com", "client-id-123", "sample-secret");
        assert_eq!(hash, "Ow2Z9GhLtdOoxgXsUcCoJEVp8+l1xrOI3SVz60tNTIg=");
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = Request::default();
        assert_eq!(bearer_token(&request), None);

        let mut request = Request::default();
        request
            .headers_mut()
            .insert("Authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&request), Some("abc123"));

        let mut request = Request::default();
        request
            .headers_mut()
            .insert("Authorization", "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn test_friendly_auth_messages() {
        assert_eq!(
            friendly_auth_message("... NotAuthorizedException ..."),
            "Incorrect email or password"
        );
        assert_eq!(
            friendly_auth_message("... UserNotFoundException ..."),
            "No account found with this email"
        );
        assert_eq!(
            friendly_auth_message("something else entirely"),
            "Login failed. Please check your credentials"
        );
    }
}
