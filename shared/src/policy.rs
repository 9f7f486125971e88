use crate::error::ApiError;
use crate::types::Role;

/// Optional filters a caller may attach to a history or user query. Which of
/// them are honored depends on the caller's role.
#[derive(Debug, Default, Clone)]
pub struct QueryFilters {
    pub user_id: Option<String>,
    pub doctor_id: Option<String>,
    pub user_name: Option<String>,
    pub doctor_name: Option<String>,
}

/// Which slice of the store a request is entitled to read. One variant per
/// role; the resolver has one branch per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessScope {
    /// USER: always and only the caller's own records, filters ignored.
    OwnRecords { account_id: String },
    /// DOCTOR: accounts assigned to the caller, optionally narrowed by a
    /// partial name match. Id filters are not honored for doctors.
    AssignedPatients {
        doctor_id: String,
        patient_name: Option<String>,
    },
    /// ADMIN: one filter branch, picked by precedence.
    Unrestricted(AdminFilter),
}

/// Admin filter precedence: first present wins, the rest are not consulted.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminFilter {
    ById(String),
    ByDoctorId(String),
    ByDoctorName(String),
    ByPatientName(String),
    All,
}

/// Decide whether the requester may run the query at all and which filters
/// are legal for its role. Pure; no store access.
pub fn authorize(
    rol: &str,
    account_id: &str,
    filters: &QueryFilters,
) -> Result<AccessScope, ApiError> {
    let role = Role::parse(rol).ok_or(ApiError::Forbidden)?;

    Ok(match role {
        Role::User => AccessScope::OwnRecords {
            account_id: account_id.to_string(),
        },
        Role::Doctor => AccessScope::AssignedPatients {
            doctor_id: account_id.to_string(),
            patient_name: filters.user_name.clone(),
        },
        Role::Admin => AccessScope::Unrestricted(admin_filter(filters)),
    })
}

fn admin_filter(filters: &QueryFilters) -> AdminFilter {
    if let Some(user_id) = &filters.user_id {
        AdminFilter::ById(user_id.clone())
    } else if let Some(doctor_id) = &filters.doctor_id {
        AdminFilter::ByDoctorId(doctor_id.clone())
    } else if let Some(doctor_name) = &filters.doctor_name {
        AdminFilter::ByDoctorName(doctor_name.clone())
    } else if let Some(user_name) = &filters.user_name {
        AdminFilter::ByPatientName(user_name.clone())
    } else {
        AdminFilter::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_filters() -> QueryFilters {
        QueryFilters {
            user_id: Some("u-1".to_string()),
            doctor_id: Some("d-1".to_string()),
            user_name: Some("ana".to_string()),
            doctor_name: Some("lopez".to_string()),
        }
    }

    #[test]
    fn test_user_scope_ignores_all_filters() {
        let scope = authorize("USER", "self-id", &all_filters()).unwrap();
        assert_eq!(
            scope,
            AccessScope::OwnRecords {
                account_id: "self-id".to_string()
            }
        );
    }

    #[test]
    fn test_doctor_scope_honors_only_patient_name() {
        let scope = authorize("DOCTOR", "doc-id", &all_filters()).unwrap();
        assert_eq!(
            scope,
            AccessScope::AssignedPatients {
                doctor_id: "doc-id".to_string(),
                patient_name: Some("ana".to_string()),
            }
        );
    }

    #[test]
    fn test_doctor_scope_without_name_filter() {
        let scope = authorize("DOCTOR", "doc-id", &QueryFilters::default()).unwrap();
        assert_eq!(
            scope,
            AccessScope::AssignedPatients {
                doctor_id: "doc-id".to_string(),
                patient_name: None,
            }
        );
    }

    #[test]
    fn test_admin_user_id_takes_precedence() {
        let scope = authorize("ADMIN", "adm", &all_filters()).unwrap();
        assert_eq!(
            scope,
            AccessScope::Unrestricted(AdminFilter::ById("u-1".to_string()))
        );
    }

    #[test]
    fn test_admin_precedence_chain() {
        let mut filters = all_filters();
        filters.user_id = None;
        let scope = authorize("ADMIN", "adm", &filters).unwrap();
        assert_eq!(
            scope,
            AccessScope::Unrestricted(AdminFilter::ByDoctorId("d-1".to_string()))
        );

        filters.doctor_id = None;
        let scope = authorize("ADMIN", "adm", &filters).unwrap();
        assert_eq!(
            scope,
            AccessScope::Unrestricted(AdminFilter::ByDoctorName("lopez".to_string()))
        );

        filters.doctor_name = None;
        let scope = authorize("ADMIN", "adm", &filters).unwrap();
        assert_eq!(
            scope,
            AccessScope::Unrestricted(AdminFilter::ByPatientName("ana".to_string()))
        );

        filters.user_name = None;
        let scope = authorize("ADMIN", "adm", &filters).unwrap();
        assert_eq!(scope, AccessScope::Unrestricted(AdminFilter::All));
    }

    #[test]
    fn test_unknown_role_is_forbidden() {
        let result = authorize("NURSE", "someone", &QueryFilters::default());
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }
}
