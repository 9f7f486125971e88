use aws_sdk_cognitoidentityprovider::types::AttributeType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::auth;
use crate::error::{json_response, ApiError};
use crate::policy::{self, AccessScope, AdminFilter, QueryFilters};
use crate::resolver;
use crate::store::Store;
use crate::types::{Account, RegisterRequest};

/// POST /users: public registration. The role string is validated against
/// the dynamic allow-list before the identity or the account row exists, so
/// a rejected role leaves nothing behind.
pub async fn register(
    cognito: &CognitoClient,
    store: &Store<'_>,
    client_id: &str,
    client_secret: &str,
    user_pool_id: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    tracing::info!("Signup request received");

    let request: RegisterRequest = match serde_json::from_str(crate::body_text(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            return ApiError::Validation(format!("Invalid request body: {}", e)).into_response();
        }
    };

    match create_account(cognito, store, client_id, client_secret, user_pool_id, request).await {
        Ok((account, tokens)) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({
                "usuario": account,
                "access_token": tokens.access_token,
                "refresh_token": tokens.refresh_token,
                "expires_in": tokens.expires_in,
            }),
        ),
        Err(e) => e.into_response(),
    }
}

async fn create_account(
    cognito: &CognitoClient,
    store: &Store<'_>,
    client_id: &str,
    client_secret: &str,
    user_pool_id: &str,
    request: RegisterRequest,
) -> Result<(Account, crate::types::SessionTokens), ApiError> {
    let rol = request.rol.unwrap_or_else(|| "USER".to_string());

    // Allow-list check comes first; an unknown role creates nothing.
    let allowlist = store.role_allowlist().await?;
    validate_rol(&allowlist, &rol)?;

    tracing::info!("Signing up user: {}", request.email);

    let secret_hash = auth::compute_secret_hash(&request.email, client_id, client_secret);

    let signup_result = cognito
        .sign_up()
        .client_id(client_id)
        .username(&request.email)
        .password(&request.password)
        .secret_hash(&secret_hash)
        .user_attributes(
            AttributeType::builder()
                .name("email")
                .value(&request.email)
                .build()
                .map_err(|e| ApiError::AuthProvider(e.to_string()))?,
        )
        .send()
        .await
        .map_err(|e| {
            let error_message = format!("{:?}", e);
            tracing::error!("Cognito signup error: {}", error_message);
            ApiError::Validation(friendly_signup_message(&error_message))
        })?;

    let account_id = signup_result.user_sub().to_string();

    // The password was just validated by sign_up; confirm so the automatic
    // login below succeeds without an email round-trip.
    if let Err(e) = cognito
        .admin_confirm_sign_up()
        .user_pool_id(user_pool_id)
        .username(&request.email)
        .send()
        .await
    {
        tracing::error!("Failed to auto-confirm user: {:?}", e);
    } else {
        tracing::info!("User auto-confirmed: {}", request.email);
    }

    let account = Account {
        id_usuario: account_id,
        email: request.email.clone(),
        nombre: request.nombre,
        apellido: request.apellido,
        rol,
        doctor_id: None,
        fecha_nacimiento: request.fecha_nacimiento,
        direccion: request.direccion,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    store.put_account(&account).await?;

    let tokens = auth::password_grant(
        cognito,
        client_id,
        client_secret,
        &request.email,
        &request.password,
    )
    .await?;

    tracing::info!("Signup successful for user: {}", request.email);

    Ok((account, tokens))
}

fn validate_rol(allowlist: &[String], rol: &str) -> Result<(), ApiError> {
    if allowlist.iter().any(|allowed| allowed == rol) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("Invalid role: {}", rol)))
    }
}

/// Extract a user-friendly error message from a Cognito signup error dump.
fn friendly_signup_message(error_message: &str) -> String {
    if error_message.contains("InvalidPasswordException") {
        "Password must contain at least 8 characters with uppercase, lowercase, number, and special character".to_string()
    } else if error_message.contains("UsernameExistsException") {
        "An account with this email already exists".to_string()
    } else if error_message.contains("InvalidParameterException") {
        "Invalid email or password format".to_string()
    } else {
        "Signup failed. Please check your details and try again".to_string()
    }
}

/// GET /users: role-scoped account listing. USER sees only itself, DOCTOR
/// its assigned patients, ADMIN everything modulo the id filters.
pub async fn list_users(
    store: &Store<'_>,
    requester: &Account,
    filters: &QueryFilters,
) -> Result<Response<Body>, Error> {
    match resolve_accounts(store, requester, filters).await {
        Ok(usuarios) => json_response(StatusCode::OK, &serde_json::json!({ "usuarios": usuarios })),
        Err(e) => e.into_response(),
    }
}

async fn resolve_accounts(
    store: &Store<'_>,
    requester: &Account,
    filters: &QueryFilters,
) -> Result<Vec<Account>, ApiError> {
    let scope = policy::authorize(&requester.rol, &requester.id_usuario, filters)?;

    match scope {
        AccessScope::OwnRecords { .. } => Ok(vec![requester.clone()]),

        AccessScope::AssignedPatients {
            doctor_id,
            patient_name,
        } => {
            let patients = store.accounts_by_doctor(&doctor_id).await?;
            Ok(match patient_name {
                Some(needle) => resolver::restrict_by_name(patients, &needle),
                None => patients,
            })
        }

        AccessScope::Unrestricted(filter) => match filter {
            AdminFilter::ById(user_id) => {
                Ok(store.get_account(&user_id).await?.into_iter().collect())
            }
            AdminFilter::ByDoctorId(doctor_id) => store.accounts_by_doctor(&doctor_id).await,
            AdminFilter::ByDoctorName(needle) => {
                let doctors =
                    resolver::restrict_by_name(store.accounts_by_role("DOCTOR").await?, &needle);
                let mut accounts = Vec::new();
                for doctor in &doctors {
                    accounts.extend(store.accounts_by_doctor(&doctor.id_usuario).await?);
                }
                Ok(accounts)
            }
            AdminFilter::ByPatientName(needle) => {
                Ok(resolver::restrict_by_name(store.all_accounts().await?, &needle))
            }
            AdminFilter::All => store.all_accounts().await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rol_against_allowlist() {
        let allowlist = vec![
            "USER".to_string(),
            "DOCTOR".to_string(),
            "ADMIN".to_string(),
        ];
        assert!(validate_rol(&allowlist, "USER").is_ok());
        assert!(validate_rol(&allowlist, "DOCTOR").is_ok());
        assert!(matches!(
            validate_rol(&allowlist, "NURSE"),
            Err(ApiError::Validation(_))
        ));
        // Match is exact, not case-insensitive.
        assert!(matches!(
            validate_rol(&allowlist, "user"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_friendly_signup_messages() {
        assert_eq!(
            friendly_signup_message("... UsernameExistsException ..."),
            "An account with this email already exists"
        );
        assert!(friendly_signup_message("unmapped").starts_with("Signup failed"));
    }
}
