use serde::{Deserialize, Serialize};

// ========== ACCOUNT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    pub id_usuario: String,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    pub rol: String, // USER | DOCTOR | ADMIN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_nacimiento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    pub created_at: String,
}

impl Account {
    /// Display name shown on history results: first + last, space-joined.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido).trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
    pub fecha_nacimiento: Option<String>,
    pub direccion: Option<String>,
    pub rol: Option<String>,
}

// ========== ROLE ==========
/// The three roles the access-control layer dispatches on. Role strings on
/// accounts are validated against the dynamic allow-list at registration;
/// anything the dispatch does not recognize is rejected at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Doctor,
    Admin,
}

impl Role {
    pub fn parse(rol: &str) -> Option<Role> {
        match rol {
            "USER" => Some(Role::User),
            "DOCTOR" => Some(Role::Doctor),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Doctor => "DOCTOR",
            Role::Admin => "ADMIN",
        }
    }
}

// ========== MEDICAL HISTORY ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MedicalEntry {
    pub id_usuario: String,
    pub pregunta: String,
    pub value: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuestionAnswer {
    pub pregunta: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitHistoryRequest {
    pub preguntas_medicas: Vec<QuestionAnswer>,
}

/// One patient's slice of the read-side response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PatientHistory {
    pub nombre: String,
    pub preguntas_medicas: Vec<QuestionAnswer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub results: Vec<PatientHistory>,
}

// ========== AUTH ==========
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub email: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i32,
}
