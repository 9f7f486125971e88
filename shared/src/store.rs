use std::collections::HashMap;

use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};

use crate::error::ApiError;
use crate::types::{Account, MedicalEntry, QuestionAnswer};

/// Typed access to the single-table layout:
/// - `PK = USER#{id}`, `SK = PROFILE`: usuario rows
/// - `PK = USER#{id}`, `SK = PREGUNTA#{uuid}`: question/answer rows
/// - `PK = ROL#{rol}`, `SK = METADATA`: role allow-list rows
///
/// The client and table name are owned by the process entry point and
/// borrowed here per request.
pub struct Store<'a> {
    client: &'a DynamoClient,
    table: &'a str,
}

impl<'a> Store<'a> {
    pub fn new(client: &'a DynamoClient, table: &'a str) -> Self {
        Self { client, table }
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>, ApiError> {
        let pk = format!("USER#{}", account_id);

        let result = self
            .client
            .get_item()
            .table_name(self.table)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S("PROFILE".to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;

        Ok(result.item().and_then(account_from_item))
    }

    pub async fn put_account(&self, account: &Account) -> Result<(), ApiError> {
        let pk = format!("USER#{}", account.id_usuario);

        let mut put_request = self
            .client
            .put_item()
            .table_name(self.table)
            .item("PK", AttributeValue::S(pk.clone()))
            .item("SK", AttributeValue::S("PROFILE".to_string()))
            .item("entity_type", AttributeValue::S("usuario".to_string()))
            .item("email", AttributeValue::S(account.email.clone()))
            .item("nombre", AttributeValue::S(account.nombre.clone()))
            .item("apellido", AttributeValue::S(account.apellido.clone()))
            .item("rol", AttributeValue::S(account.rol.clone()))
            .item("created_at", AttributeValue::S(account.created_at.clone()));

        if let Some(doctor_id) = &account.doctor_id {
            put_request = put_request.item("doctor_id", AttributeValue::S(doctor_id.clone()));
        }
        if let Some(fecha) = &account.fecha_nacimiento {
            put_request = put_request.item("fecha_nacimiento", AttributeValue::S(fecha.clone()));
        }
        if let Some(direccion) = &account.direccion {
            put_request = put_request.item("direccion", AttributeValue::S(direccion.clone()));
        }

        put_request
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;
        Ok(())
    }

    pub async fn all_accounts(&self) -> Result<Vec<Account>, ApiError> {
        let result = self
            .client
            .scan()
            .table_name(self.table)
            .filter_expression("entity_type = :type")
            .expression_attribute_values(":type", AttributeValue::S("usuario".to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;

        Ok(result.items().iter().filter_map(account_from_item).collect())
    }

    /// All accounts whose assigned doctor is `doctor_id` ("my patients").
    pub async fn accounts_by_doctor(&self, doctor_id: &str) -> Result<Vec<Account>, ApiError> {
        let result = self
            .client
            .scan()
            .table_name(self.table)
            .filter_expression("entity_type = :type AND doctor_id = :doctor")
            .expression_attribute_values(":type", AttributeValue::S("usuario".to_string()))
            .expression_attribute_values(":doctor", AttributeValue::S(doctor_id.to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;

        Ok(result.items().iter().filter_map(account_from_item).collect())
    }

    pub async fn accounts_by_role(&self, rol: &str) -> Result<Vec<Account>, ApiError> {
        let result = self
            .client
            .scan()
            .table_name(self.table)
            .filter_expression("entity_type = :type AND rol = :rol")
            .expression_attribute_values(":type", AttributeValue::S("usuario".to_string()))
            .expression_attribute_values(":rol", AttributeValue::S(rol.to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;

        Ok(result.items().iter().filter_map(account_from_item).collect())
    }

    /// Persist the balancer's choice onto the submitting account.
    pub async fn assign_doctor(&self, account_id: &str, doctor_id: &str) -> Result<(), ApiError> {
        let pk = format!("USER#{}", account_id);

        self.client
            .update_item()
            .table_name(self.table)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S("PROFILE".to_string()))
            .update_expression("SET doctor_id = :doctor")
            .expression_attribute_values(":doctor", AttributeValue::S(doctor_id.to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;
        Ok(())
    }

    /// Question/answer rows for one owner, in the order the store returns them.
    pub async fn entries_for(&self, account_id: &str) -> Result<Vec<MedicalEntry>, ApiError> {
        let pk = format!("USER#{}", account_id);

        let result = self
            .client
            .query()
            .table_name(self.table)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(pk))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("PREGUNTA#".to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;

        let mut entries = Vec::new();
        for item in result.items() {
            if let Some(entry) = entry_from_item(account_id, item) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Insert one row per question/answer pair, owned by `account_id`.
    /// A failed put aborts the loop; rows already written stay written.
    pub async fn insert_entries(
        &self,
        account_id: &str,
        entries: &[QuestionAnswer],
    ) -> Result<Vec<MedicalEntry>, ApiError> {
        let pk = format!("USER#{}", account_id);
        let now = chrono::Utc::now().to_rfc3339();
        let mut inserted = Vec::new();

        for entry in entries {
            let sk = format!("PREGUNTA#{}", uuid::Uuid::new_v4());

            self.client
                .put_item()
                .table_name(self.table)
                .item("PK", AttributeValue::S(pk.clone()))
                .item("SK", AttributeValue::S(sk))
                .item("entity_type", AttributeValue::S("pregunta".to_string()))
                .item("pregunta", AttributeValue::S(entry.pregunta.clone()))
                .item("value", AttributeValue::S(entry.value.clone()))
                .item("created_at", AttributeValue::S(now.clone()))
                .send()
                .await
                .map_err(|e| ApiError::Store(e.to_string()))?;

            inserted.push(MedicalEntry {
                id_usuario: account_id.to_string(),
                pregunta: entry.pregunta.clone(),
                value: entry.value.clone(),
                created_at: now.clone(),
            });
        }

        Ok(inserted)
    }

    /// The dynamic role allow-list. Entries are only ever added out of band;
    /// nothing in the request path removes them.
    pub async fn role_allowlist(&self) -> Result<Vec<String>, ApiError> {
        let result = self
            .client
            .scan()
            .table_name(self.table)
            .filter_expression("entity_type = :type")
            .expression_attribute_values(":type", AttributeValue::S("rol".to_string()))
            .send()
            .await
            .map_err(|e| ApiError::Store(e.to_string()))?;

        let mut roles = Vec::new();
        for item in result.items() {
            if let Some(rol) = item.get("rol").and_then(|v| v.as_s().ok()) {
                roles.push(rol.clone());
            }
        }
        Ok(roles)
    }
}

fn account_from_item(item: &HashMap<String, AttributeValue>) -> Option<Account> {
    let pk = item.get("PK").and_then(|v| v.as_s().ok())?;
    let id_usuario = pk.strip_prefix("USER#")?.to_string();

    Some(Account {
        id_usuario,
        email: string_attr(item, "email")?,
        nombre: string_attr(item, "nombre")?,
        apellido: string_attr(item, "apellido")?,
        rol: string_attr(item, "rol")?,
        doctor_id: string_attr(item, "doctor_id"),
        fecha_nacimiento: string_attr(item, "fecha_nacimiento"),
        direccion: string_attr(item, "direccion"),
        created_at: string_attr(item, "created_at").unwrap_or_default(),
    })
}

fn entry_from_item(
    account_id: &str,
    item: &HashMap<String, AttributeValue>,
) -> Option<MedicalEntry> {
    Some(MedicalEntry {
        id_usuario: account_id.to_string(),
        pregunta: string_attr(item, "pregunta")?,
        value: string_attr(item, "value")?,
        created_at: string_attr(item, "created_at").unwrap_or_default(),
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}
