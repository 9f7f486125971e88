use crate::error::ApiError;
use crate::policy::{AccessScope, AdminFilter};
use crate::store::Store;
use crate::types::Account;

/// Turn an authorized scope into the concrete list of account identifiers
/// whose records the request may read. Duplicates are tolerated; the
/// aggregator groups per identifier. Any store error aborts the whole
/// request with no partial result.
pub async fn resolve_targets(
    store: &Store<'_>,
    scope: &AccessScope,
) -> Result<Vec<String>, ApiError> {
    match scope {
        AccessScope::OwnRecords { account_id } => Ok(vec![account_id.clone()]),

        AccessScope::AssignedPatients {
            doctor_id,
            patient_name,
        } => {
            let patients = store.accounts_by_doctor(doctor_id).await?;
            let patients = match patient_name {
                Some(needle) => restrict_by_name(patients, needle),
                None => patients,
            };
            Ok(ids(patients))
        }

        AccessScope::Unrestricted(filter) => match filter {
            // The id is used as-is against the question table; the account
            // row is never resolved. A nonexistent id just yields no rows.
            AdminFilter::ById(user_id) => Ok(vec![user_id.clone()]),

            AdminFilter::ByDoctorId(doctor_id) => {
                Ok(ids(store.accounts_by_doctor(doctor_id).await?))
            }

            AdminFilter::ByDoctorName(needle) => {
                let doctors = restrict_by_name(store.accounts_by_role("DOCTOR").await?, needle);
                let mut targets = Vec::new();
                for doctor in &doctors {
                    targets.extend(ids(store.accounts_by_doctor(&doctor.id_usuario).await?));
                }
                Ok(targets)
            }

            AdminFilter::ByPatientName(needle) => {
                Ok(ids(restrict_by_name(store.all_accounts().await?, needle)))
            }

            AdminFilter::All => Ok(ids(store.all_accounts().await?)),
        },
    }
}

/// Substring match, case-insensitive, on first OR last name.
pub(crate) fn name_matches(account: &Account, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    account.nombre.to_lowercase().contains(&needle)
        || account.apellido.to_lowercase().contains(&needle)
}

pub(crate) fn restrict_by_name(accounts: Vec<Account>, needle: &str) -> Vec<Account> {
    accounts
        .into_iter()
        .filter(|account| name_matches(account, needle))
        .collect()
}

fn ids(accounts: Vec<Account>) -> Vec<String> {
    accounts
        .into_iter()
        .map(|account| account.id_usuario)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, nombre: &str, apellido: &str) -> Account {
        Account {
            id_usuario: id.to_string(),
            email: format!("{}@example.com", id),
            nombre: nombre.to_string(),
            apellido: apellido.to_string(),
            rol: "USER".to_string(),
            doctor_id: None,
            fecha_nacimiento: None,
            direccion: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let ana = account("u1", "Ana", "Gomez");
        assert!(name_matches(&ana, "ana"));
        assert!(name_matches(&ana, "ANA"));
        assert!(name_matches(&ana, "GoM"));
    }

    #[test]
    fn test_name_match_checks_both_fields() {
        let ana = account("u1", "Ana", "Gomez");
        assert!(name_matches(&ana, "gomez"));
        assert!(name_matches(&ana, "an"));
        assert!(!name_matches(&ana, "lopez"));
    }

    #[test]
    fn test_restrict_by_name_subsets() {
        let accounts = vec![
            account("u1", "Ana", "Gomez"),
            account("u2", "Pedro", "Santana"),
            account("u3", "Luz", "Diaz"),
        ];
        let matched = restrict_by_name(accounts, "an");
        let matched_ids: Vec<&str> = matched.iter().map(|a| a.id_usuario.as_str()).collect();
        // "an" hits Ana (nombre) and Santana (apellido), never Diaz.
        assert_eq!(matched_ids, vec!["u1", "u2"]);
    }

    #[test]
    fn test_restrict_by_name_can_empty_out() {
        let accounts = vec![account("u1", "Ana", "Gomez")];
        assert!(restrict_by_name(accounts, "zzz").is_empty());
    }

    // Client never sends a request on these branches, so an offline config
    // is enough to exercise them end to end.
    fn offline_store_client() -> aws_sdk_dynamodb::Client {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        aws_sdk_dynamodb::Client::from_conf(config)
    }

    #[tokio::test]
    async fn test_user_scope_resolves_to_self_only() {
        let client = offline_store_client();
        let store = Store::new(&client, "test-table");
        let scope = AccessScope::OwnRecords {
            account_id: "self-id".to_string(),
        };
        let targets = resolve_targets(&store, &scope).await.unwrap();
        assert_eq!(targets, vec!["self-id".to_string()]);
    }

    #[tokio::test]
    async fn test_admin_id_filter_is_used_verbatim() {
        let client = offline_store_client();
        let store = Store::new(&client, "test-table");
        let scope = AccessScope::Unrestricted(AdminFilter::ById("u-42".to_string()));
        let targets = resolve_targets(&store, &scope).await.unwrap();
        assert_eq!(targets, vec!["u-42".to_string()]);
    }
}
