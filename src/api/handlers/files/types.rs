use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::Admission;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Opaque id to pass to `/convert_all`
    pub file_id: String,
    pub original_name: String,
}

impl From<Admission> for UploadResponse {
    fn from(admission: Admission) -> Self {
        Self {
            file_id: admission.stored_name,
            original_name: admission.original_name,
        }
    }
}

/// Fields are taken as raw JSON so a missing or mistyped one gets the same
/// error as an empty one instead of a deserialization rejection.
#[derive(Deserialize, ToSchema)]
pub struct ConvertAllRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub conversion_type: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub file_ids: Option<Value>,
}

impl ConvertAllRequest {
    /// Requested ids, empty unless `file_ids` is a list. Entries that are not
    /// strings become names no pool knows.
    pub fn file_ids(&self) -> Vec<String> {
        match &self.file_ids {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn conversion_type(&self) -> &str {
        self.conversion_type
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[derive(Serialize, ToSchema)]
pub struct ConvertAllResponse {
    pub download_url: String,
}
