use std::collections::HashSet;

use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::balancer;
use crate::error::{json_response, ApiError};
use crate::policy::{self, QueryFilters};
use crate::resolver;
use crate::store::Store;
use crate::types::{
    Account, HistoryResponse, MedicalEntry, PatientHistory, QuestionAnswer, Role,
    SubmitHistoryRequest,
};

/// GET /history: role-scoped read of question/answer records.
pub async fn get_history(
    store: &Store<'_>,
    requester: &Account,
    filters: &QueryFilters,
) -> Result<Response<Body>, Error> {
    tracing::info!(
        "History query by {} (rol {})",
        requester.id_usuario,
        requester.rol
    );

    match fetch_history(store, requester, filters).await {
        Ok(results) => json_response(StatusCode::OK, &HistoryResponse { results }),
        Err(e) => e.into_response(),
    }
}

async fn fetch_history(
    store: &Store<'_>,
    requester: &Account,
    filters: &QueryFilters,
) -> Result<Vec<PatientHistory>, ApiError> {
    let scope = policy::authorize(&requester.rol, &requester.id_usuario, filters)?;
    let targets = resolver::resolve_targets(store, &scope).await?;

    let mut results = Vec::new();
    for target in unique_targets(targets) {
        let entries = store.entries_for(&target).await?;
        // Owners with no written history never appear in the output.
        if entries.is_empty() {
            continue;
        }
        let nombre = display_name_or_unknown(store.get_account(&target).await?);
        results.push(PatientHistory {
            nombre,
            preguntas_medicas: entries.into_iter().map(to_question_answer).collect(),
        });
    }
    Ok(results)
}

/// POST /history: a USER appends question/answer pairs to their own record.
/// First submission assigns a doctor before anything is written.
pub async fn submit_history(
    store: &Store<'_>,
    requester: &Account,
    body: &Body,
) -> Result<Response<Body>, Error> {
    match insert_history(store, requester, body).await {
        Ok(inserted) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({ "message": "Preguntas inserted", "data": inserted }),
        ),
        Err(e) => e.into_response(),
    }
}

async fn insert_history(
    store: &Store<'_>,
    requester: &Account,
    body: &Body,
) -> Result<Vec<MedicalEntry>, ApiError> {
    if Role::parse(&requester.rol) != Some(Role::User) {
        return Err(ApiError::Forbidden);
    }

    let request: SubmitHistoryRequest = serde_json::from_str(crate::body_text(body))
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;
    validate_submission(&request.preguntas_medicas)?;

    balancer::ensure_doctor_assigned(store, requester).await?;

    store
        .insert_entries(&requester.id_usuario, &request.preguntas_medicas)
        .await
}

fn validate_submission(entries: &[QuestionAnswer]) -> Result<(), ApiError> {
    if entries.is_empty() {
        return Err(ApiError::Validation("No preguntas provided".to_string()));
    }
    Ok(())
}

/// Order-preserving de-duplication; the resolver may hand back repeats.
fn unique_targets(targets: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

fn display_name_or_unknown(account: Option<Account>) -> String {
    match account {
        Some(account) => account.display_name(),
        None => "Unknown".to_string(),
    }
}

fn to_question_answer(entry: MedicalEntry) -> QuestionAnswer {
    QuestionAnswer {
        pregunta: entry.pregunta,
        value: entry.value,
    }
}
