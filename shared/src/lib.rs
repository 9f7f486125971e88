pub mod auth;
pub mod balancer;
pub mod error;
pub mod history;
pub mod policy;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod types;
pub mod users;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::Body;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub cognito_client: CognitoClient,
    pub dynamo_client: DynamoClient,
}

impl AppState {
    pub fn new(cognito_client: CognitoClient, dynamo_client: DynamoClient) -> Arc<Self> {
        Arc::new(Self {
            cognito_client,
            dynamo_client,
        })
    }
}

/// Request bodies arrive as text, bytes, or nothing depending on the
/// gateway; normalize before JSON parsing.
pub fn body_text(body: &Body) -> &str {
    match body {
        Body::Text(text) => text,
        Body::Binary(bytes) => std::str::from_utf8(bytes).unwrap_or(""),
        Body::Empty => "",
    }
}
