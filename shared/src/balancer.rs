use rand::seq::SliceRandom;

use crate::error::ApiError;
use crate::store::Store;
use crate::types::Account;

/// Make sure a submitting user has an assigned doctor, picking the least
/// loaded one on first submission. Returns the doctor identifier in effect
/// after the call.
///
/// The count-then-assign sequence is not atomic: two concurrent first
/// submissions can observe the same counts and land on the same doctor.
/// That only skews the balance, it never breaks record ownership.
pub async fn ensure_doctor_assigned(
    store: &Store<'_>,
    account: &Account,
) -> Result<String, ApiError> {
    // Assigned at most once; after that this is a no-op.
    if let Some(doctor_id) = &account.doctor_id {
        return Ok(doctor_id.clone());
    }

    let doctors = store.accounts_by_role("DOCTOR").await?;
    if doctors.is_empty() {
        return Err(ApiError::NoDoctorsAvailable);
    }

    let accounts = store.all_accounts().await?;
    let candidates = least_loaded(&doctors, &accounts);
    let chosen = candidates
        .choose(&mut rand::thread_rng())
        .ok_or(ApiError::NoDoctorsAvailable)?;

    store
        .assign_doctor(&account.id_usuario, &chosen.id_usuario)
        .await?;

    tracing::info!(
        "Assigned doctor {} to user {}",
        chosen.id_usuario,
        account.id_usuario
    );

    Ok(chosen.id_usuario.clone())
}

/// Doctors whose patient count equals the minimum across all doctors.
fn least_loaded<'a>(doctors: &'a [Account], accounts: &[Account]) -> Vec<&'a Account> {
    let counts: Vec<usize> = doctors
        .iter()
        .map(|doctor| {
            accounts
                .iter()
                .filter(|a| a.doctor_id.as_deref() == Some(doctor.id_usuario.as_str()))
                .count()
        })
        .collect();

    let min = counts.iter().copied().min().unwrap_or(0);

    doctors
        .iter()
        .zip(&counts)
        .filter(|(_, count)| **count == min)
        .map(|(doctor, _)| doctor)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: &str) -> Account {
        Account {
            id_usuario: id.to_string(),
            email: format!("{}@clinic.example", id),
            nombre: "Doc".to_string(),
            apellido: id.to_string(),
            rol: "DOCTOR".to_string(),
            doctor_id: None,
            fecha_nacimiento: None,
            direccion: None,
            created_at: String::new(),
        }
    }

    fn patient(id: &str, doctor_id: Option<&str>) -> Account {
        Account {
            id_usuario: id.to_string(),
            email: format!("{}@example.com", id),
            nombre: "Pat".to_string(),
            apellido: id.to_string(),
            rol: "USER".to_string(),
            doctor_id: doctor_id.map(|d| d.to_string()),
            fecha_nacimiento: None,
            direccion: None,
            created_at: String::new(),
        }
    }

    fn patients(doctor_id: &str, count: usize) -> Vec<Account> {
        (0..count)
            .map(|i| patient(&format!("{}-p{}", doctor_id, i), Some(doctor_id)))
            .collect()
    }

    #[test]
    fn test_least_loaded_excludes_busier_doctors() {
        // Counts [3, 5, 3]: the count-5 doctor must never be a candidate.
        let doctors = vec![doctor("d1"), doctor("d2"), doctor("d3")];
        let mut accounts = patients("d1", 3);
        accounts.extend(patients("d2", 5));
        accounts.extend(patients("d3", 3));

        let candidates = least_loaded(&doctors, &accounts);
        let candidate_ids: Vec<&str> =
            candidates.iter().map(|d| d.id_usuario.as_str()).collect();
        assert_eq!(candidate_ids, vec!["d1", "d3"]);
    }

    #[test]
    fn test_least_loaded_single_doctor() {
        let doctors = vec![doctor("d1")];
        let accounts = patients("d1", 4);
        let candidates = least_loaded(&doctors, &accounts);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id_usuario, "d1");
    }

    #[test]
    fn test_unassigned_users_do_not_count() {
        let doctors = vec![doctor("d1"), doctor("d2")];
        let accounts = vec![
            patient("p1", Some("d1")),
            patient("p2", None),
            patient("p3", None),
        ];
        let candidates = least_loaded(&doctors, &accounts);
        let candidate_ids: Vec<&str> =
            candidates.iter().map(|d| d.id_usuario.as_str()).collect();
        assert_eq!(candidate_ids, vec!["d2"]);
    }

    #[test]
    fn test_all_tied_means_all_candidates() {
        let doctors = vec![doctor("d1"), doctor("d2"), doctor("d3")];
        let candidates = least_loaded(&doctors, &[]);
        assert_eq!(candidates.len(), 3);
    }

    #[tokio::test]
    async fn test_assigned_account_is_never_reassigned() {
        // Short-circuits before any store call, so an offline client works.
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = aws_sdk_dynamodb::Client::from_conf(config);
        let store = Store::new(&client, "test-table");

        let account = patient("p1", Some("d-9"));
        let assigned = ensure_doctor_assigned(&store, &account).await.unwrap();
        assert_eq!(assigned, "d-9");
    }
}
