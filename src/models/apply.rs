//! Input and result shapes for applying a template.

use serde::{Deserialize, Serialize};

/// Payload for applying a template. Which fields are required depends on the
/// content type being applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTemplateInput {
    /// Name for the created room or project
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    /// Member ID of whoever applies the template
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Descriptor of what an apply created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplyResult {
    #[serde(rename_all = "camelCase")]
    Room { room_id: String, project_id: String },
    #[serde(rename_all = "camelCase")]
    EquipmentPackage { room_id: String, project_id: String },
    #[serde(rename_all = "camelCase")]
    Project { project_id: String },
    #[serde(rename_all = "camelCase")]
    Quote {
        quote_id: String,
        room_id: String,
        project_id: String,
    },
}
