use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use medrec_shared::{auth, history, policy::QueryFilters, roles, store::Store, users, AppState};
use std::env;
use std::sync::Arc;

/// Main Lambda handler - routes requests to auth, user and history endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET,POST,OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    // Health check
    if path == "/" {
        return match method {
            &Method::GET => json_ok(serde_json::json!({ "message": "Hello!" })),
            _ => method_not_allowed(),
        };
    }

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "medrec".to_string());
    let store = Store::new(&state.dynamo_client, &table_name);

    // Auth endpoints (no bearer token)
    if path.starts_with("/login") {
        let client_id = env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set");
        let client_secret =
            env::var("COGNITO_CLIENT_SECRET").expect("COGNITO_CLIENT_SECRET must be set");

        return match method {
            &Method::POST => {
                auth::login(
                    &state.cognito_client,
                    &store,
                    &client_id,
                    &client_secret,
                    body,
                )
                .await
            }
            _ => method_not_allowed(),
        };
    }

    if path.starts_with("/refresh") {
        let client_id = env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set");
        let client_secret =
            env::var("COGNITO_CLIENT_SECRET").expect("COGNITO_CLIENT_SECRET must be set");

        return match method {
            &Method::POST => {
                auth::refresh_token(&state.cognito_client, &client_id, &client_secret, body).await
            }
            _ => method_not_allowed(),
        };
    }

    // Role allow-list (public)
    if path.starts_with("/roles") {
        return match method {
            &Method::GET => roles::list_roles(&store).await,
            _ => method_not_allowed(),
        };
    }

    if path.starts_with("/users") {
        return match method {
            // POST /users - public registration
            &Method::POST => {
                let client_id =
                    env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set");
                let client_secret =
                    env::var("COGNITO_CLIENT_SECRET").expect("COGNITO_CLIENT_SECRET must be set");
                let user_pool_id =
                    env::var("COGNITO_USER_POOL_ID").expect("COGNITO_USER_POOL_ID must be set");

                users::register(
                    &state.cognito_client,
                    &store,
                    &client_id,
                    &client_secret,
                    &user_pool_id,
                    body,
                )
                .await
            }
            // GET /users - role-scoped account listing
            &Method::GET => {
                let requester =
                    match auth::authenticate(&state.cognito_client, &store, &event).await {
                        Ok(account) => account,
                        Err(e) => return e.into_response(),
                    };
                let filters = QueryFilters {
                    user_id: query_param(&event, "user_id"),
                    doctor_id: query_param(&event, "doctor_id"),
                    user_name: None,
                    doctor_name: None,
                };
                users::list_users(&store, &requester, &filters).await
            }
            _ => method_not_allowed(),
        };
    }

    if path.starts_with("/history") {
        let requester = match auth::authenticate(&state.cognito_client, &store, &event).await {
            Ok(account) => account,
            Err(e) => return e.into_response(),
        };

        return match method {
            // GET /history - role-scoped history read
            &Method::GET => {
                let filters = QueryFilters {
                    user_id: query_param(&event, "user-id"),
                    doctor_id: query_param(&event, "doctor-id"),
                    user_name: query_param(&event, "user-name"),
                    doctor_name: query_param(&event, "doctor-name"),
                };
                history::get_history(&store, &requester, &filters).await
            }
            // POST /history - submit question/answer pairs
            &Method::POST => history::submit_history(&store, &requester, body).await,
            _ => method_not_allowed(),
        };
    }

    tracing::warn!("No route matched - Method: {} Path: {}", method, path);
    not_found()
}

fn query_param(event: &Request, name: &str) -> Option<String> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
        .map(|value| value.to_string())
}

fn json_ok(value: serde_json::Value) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(value.to_string().into())
        .map_err(Box::new)?)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
