//! Template and template-version models.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Platform, TemplateContent, Tier};

/// Kind of configuration a template captures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Room,
    EquipmentPackage,
    Project,
    Quote,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Room => "room",
            TemplateType::EquipmentPackage => "equipment_package",
            TemplateType::Project => "project",
            TemplateType::Quote => "quote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "room" => Some(TemplateType::Room),
            "equipment_package" => Some(TemplateType::EquipmentPackage),
            "project" => Some(TemplateType::Project),
            "quote" => Some(TemplateType::Quote),
            _ => None,
        }
    }
}

/// Visibility tier, in increasing breadth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScope {
    Personal,
    Team,
    Org,
    System,
}

impl TemplateScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateScope::Personal => "personal",
            TemplateScope::Team => "team",
            TemplateScope::Org => "org",
            TemplateScope::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(TemplateScope::Personal),
            "team" => Some(TemplateScope::Team),
            "org" => Some(TemplateScope::Org),
            "system" => Some(TemplateScope::System),
            _ => None,
        }
    }

    /// Position in the promotion order personal < team < org < system.
    pub fn rank(&self) -> u8 {
        match self {
            TemplateScope::Personal => 0,
            TemplateScope::Team => 1,
            TemplateScope::Org => 2,
            TemplateScope::System => 3,
        }
    }
}

/// A named, typed, versioned reusable configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub template_type: TemplateType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub scope: TemplateScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default)]
    pub category_tags: Vec<String>,
    /// Number of the version the template currently points at (0 before first content)
    pub current_version: i64,
    pub is_published: bool,
    pub is_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked_from_id: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Template {
    pub fn is_system(&self) -> bool {
        self.scope == TemplateScope::System
    }
}

/// One immutable content snapshot in a template's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersion {
    pub id: String,
    pub template_id: String,
    pub version_number: i64,
    pub content: TemplateContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

/// A template together with the content it currently points at.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithVersion {
    #[serde(flatten)]
    pub template: Template,
    pub current_version_data: Option<TemplateVersion>,
}

/// Row data for inserting a template; ownership already normalized.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub template_type: TemplateType,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub scope: TemplateScope,
    pub owner_id: Option<String>,
    pub team_id: Option<String>,
    pub org_id: Option<String>,
    pub category_tags: Vec<String>,
    pub is_published: bool,
    pub forked_from_id: Option<String>,
    pub created_by: String,
}

/// Ownership columns rewritten by a promotion.
#[derive(Debug, Clone)]
pub struct ScopeBinding {
    pub scope: TemplateScope,
    pub owner_id: Option<String>,
    pub team_id: Option<String>,
    pub org_id: Option<String>,
}

/// Request body for creating a new template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub template_type: TemplateType,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub scope: Option<TemplateScope>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub category_tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_published: Option<bool>,
    pub content: TemplateContent,
    #[serde(default)]
    pub change_summary: Option<String>,
    /// Member ID of the creator
    pub created_by: String,
}

/// Request body for updating template metadata. Content goes through `UpdateContentRequest`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// `null` clears the description; an absent field keeps it
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default)]
    pub category_tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
}

/// Keeps an explicit `null` apart from a missing field: `Some(None)` vs `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for appending a new content version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentRequest {
    pub content: TemplateContent,
    #[serde(default)]
    pub change_summary: Option<String>,
    pub created_by: String,
    /// Current version the caller last saw, for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for forking a template into a new lineage.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scope: Option<TemplateScope>,
    #[serde(default)]
    pub team_id: Option<String>,
    /// Organization the fork is created in; defaults to the source's
    #[serde(default)]
    pub org_id: Option<String>,
    pub created_by: String,
}

/// Request body for duplicating a template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateTemplateRequest {
    pub name: String,
    /// Organization for copies of system templates; other copies keep the source's
    #[serde(default)]
    pub org_id: Option<String>,
    pub created_by: String,
}

/// Request body for promoting a template to a broader scope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteTemplateRequest {
    pub scope: TemplateScope,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Request body for restoring a historical version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreVersionRequest {
    pub created_by: String,
}

/// Query parameters accepted by the template listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilters {
    #[serde(default, rename = "type")]
    pub template_type: Option<TemplateType>,
    #[serde(default)]
    pub scope: Option<TemplateScope>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Room templates only
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Room templates only
    #[serde(default)]
    pub tier: Option<Tier>,
}

impl TemplateFilters {
    /// Whether the listing needs each candidate's current content.
    pub fn needs_content(&self) -> bool {
        self.platform.is_some() || self.tier.is_some()
    }
}
