//! Versioned template content.
//!
//! Content is a tagged union keyed by `type`, one variant per [`TemplateType`].
//! Every snapshot is validated before it is stored.

use serde::{Deserialize, Serialize};

use super::TemplateType;
use crate::errors::AppError;

/// Most placements one equipment package may expand into.
pub const MAX_PACKAGE_SLOTS: usize = 1000;

/// Most room instances one project template may create.
pub const MAX_PROJECT_ROOMS: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Huddle,
    Conference,
    Boardroom,
    Training,
    Classroom,
    Auditorium,
    Multipurpose,
    Lobby,
    Other,
}

/// Collaboration platform a room is designed around.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Teams,
    Zoom,
    Webex,
    GoogleMeet,
    MultiPlatform,
    None,
}

/// Hardware vendor ecosystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Ecosystem {
    Poly,
    Logitech,
    Cisco,
    Crestron,
    Biamp,
    Qsc,
    Extron,
    Mixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Standard,
    Premium,
    Executive,
}

/// A piece of equipment positioned in a room template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEquipmentPlacement {
    pub equipment_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Port-to-port cabling rule between two placed items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRule {
    pub source_equipment_id: String,
    pub source_port: String,
    pub destination_equipment_id: String,
    pub destination_port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cable_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomTemplateContent {
    pub room_type: RoomType,
    pub width: f64,
    pub length: f64,
    pub ceiling_height: f64,
    pub platform: Platform,
    pub ecosystem: Ecosystem,
    pub tier: Tier,
    #[serde(default)]
    pub placed_equipment: Vec<TemplateEquipmentPlacement>,
    #[serde(default)]
    pub connections: Vec<ConnectionRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageItem {
    pub equipment_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentPackageContent {
    pub category: String,
    #[serde(default)]
    pub items: Vec<PackageItem>,
    /// Snapshot of catalog pricing when the package was saved; may be stale.
    #[serde(default)]
    pub total_estimated_cost: f64,
}

impl EquipmentPackageContent {
    /// Number of individual placements the package expands into.
    pub fn slot_count(&self) -> usize {
        self.items.iter().map(|item| item.quantity as usize).sum()
    }
}

impl ProjectTemplateContent {
    /// Number of rooms the project expands into, non-room references included.
    pub fn room_count(&self) -> usize {
        self.rooms.iter().map(|entry| entry.quantity as usize).sum()
    }
}

/// Reference from a project template to a room template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoomEntry {
    pub template_id: String,
    pub default_name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standards_profile: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultMargins {
    pub equipment_percent: f64,
    pub labor_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTemplateContent {
    #[serde(default)]
    pub rooms: Vec<ProjectRoomEntry>,
    #[serde(default)]
    pub client_defaults: ClientDefaults,
    #[serde(default)]
    pub default_margins: DefaultMargins,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSectionConfig {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub default_margin_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaborRate {
    pub category: String,
    pub rate_per_hour: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaxTarget {
    Equipment,
    Labor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxSettings {
    pub rate: f64,
    #[serde(default)]
    pub applies_to: Vec<TaxTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTemplateContent {
    #[serde(default)]
    pub sections: Vec<QuoteSectionConfig>,
    #[serde(default)]
    pub labor_rates: Vec<LaborRate>,
    #[serde(default)]
    pub tax_settings: TaxSettings,
    #[serde(default)]
    pub terms: String,
}

/// Content snapshot stored in a template version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateContent {
    Room(RoomTemplateContent),
    EquipmentPackage(EquipmentPackageContent),
    Project(ProjectTemplateContent),
    Quote(QuoteTemplateContent),
}

impl TemplateContent {
    pub fn template_type(&self) -> TemplateType {
        match self {
            TemplateContent::Room(_) => TemplateType::Room,
            TemplateContent::EquipmentPackage(_) => TemplateType::EquipmentPackage,
            TemplateContent::Project(_) => TemplateType::Project,
            TemplateContent::Quote(_) => TemplateType::Quote,
        }
    }

    pub fn as_room(&self) -> Option<&RoomTemplateContent> {
        match self {
            TemplateContent::Room(room) => Some(room),
            _ => None,
        }
    }

    /// Check the content against the type it is stored under and its own composition rules.
    pub fn validate_for(&self, expected: TemplateType) -> Result<(), AppError> {
        if self.template_type() != expected {
            return Err(AppError::Validation(format!(
                "Content of type {} cannot be stored in a {} template",
                self.template_type().as_str(),
                expected.as_str()
            )));
        }

        match self {
            TemplateContent::Room(room) => validate_room(room),
            TemplateContent::EquipmentPackage(package) => validate_package(package),
            TemplateContent::Project(project) => validate_project(project),
            TemplateContent::Quote(quote) => validate_quote(quote),
        }
    }
}

fn validate_room(room: &RoomTemplateContent) -> Result<(), AppError> {
    for (label, value) in [
        ("width", room.width),
        ("length", room.length),
        ("ceilingHeight", room.ceiling_height),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(AppError::Validation(format!(
                "Room {} must be a positive number",
                label
            )));
        }
    }
    if room
        .placed_equipment
        .iter()
        .any(|p| p.equipment_id.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Placed equipment requires an equipmentId".to_string(),
        ));
    }
    Ok(())
}

fn validate_package(package: &EquipmentPackageContent) -> Result<(), AppError> {
    if package.category.trim().is_empty() {
        return Err(AppError::Validation(
            "Package category is required".to_string(),
        ));
    }
    for item in &package.items {
        if item.equipment_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Package items require an equipmentId".to_string(),
            ));
        }
        if item.quantity < 1 {
            return Err(AppError::Validation(format!(
                "Package item {} must have a quantity of at least 1",
                item.equipment_id
            )));
        }
    }
    if package.slot_count() > MAX_PACKAGE_SLOTS {
        return Err(AppError::Validation(format!(
            "Package expands into {} placements; the limit is {}",
            package.slot_count(),
            MAX_PACKAGE_SLOTS
        )));
    }
    if package.total_estimated_cost < 0.0 {
        return Err(AppError::Validation(
            "Total estimated cost cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_project(project: &ProjectTemplateContent) -> Result<(), AppError> {
    for entry in &project.rooms {
        if entry.template_id.trim().is_empty() || entry.default_name.trim().is_empty() {
            return Err(AppError::Validation(
                "Project rooms require a templateId and a defaultName".to_string(),
            ));
        }
        if entry.quantity < 1 {
            return Err(AppError::Validation(format!(
                "Project room {} must have a quantity of at least 1",
                entry.default_name
            )));
        }
    }
    if project.room_count() > MAX_PROJECT_ROOMS {
        return Err(AppError::Validation(format!(
            "Project expands into {} rooms; the limit is {}",
            project.room_count(),
            MAX_PROJECT_ROOMS
        )));
    }
    let margins = &project.default_margins;
    if margins.equipment_percent < 0.0 || margins.labor_percent < 0.0 {
        return Err(AppError::Validation(
            "Default margins cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_quote(quote: &QuoteTemplateContent) -> Result<(), AppError> {
    if quote.sections.iter().any(|s| s.name.trim().is_empty()) {
        return Err(AppError::Validation(
            "Quote sections require a name".to_string(),
        ));
    }
    if quote.sections.iter().any(|s| s.default_margin_percent < 0.0) {
        return Err(AppError::Validation(
            "Section margins cannot be negative".to_string(),
        ));
    }
    if quote.labor_rates.iter().any(|r| r.rate_per_hour < 0.0) {
        return Err(AppError::Validation(
            "Labor rates cannot be negative".to_string(),
        ));
    }
    if quote.tax_settings.rate < 0.0 {
        return Err(AppError::Validation(
            "Tax rate cannot be negative".to_string(),
        ));
    }
    Ok(())
}
