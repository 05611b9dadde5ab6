//! Live entities created by applying templates.
//!
//! These are owned by the room, project and quote services once created.

use serde::{Deserialize, Serialize};

use super::{Ecosystem, Platform, RoomType, Tier};

/// Equipment instance positioned inside a live room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedEquipment {
    pub id: String,
    pub equipment_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub room_type: RoomType,
    pub width: f64,
    pub length: f64,
    pub ceiling_height: f64,
    pub platform: Platform,
    pub ecosystem: Ecosystem,
    pub tier: Tier,
    #[serde(default)]
    pub placed_equipment: Vec<PlacedEquipment>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields needed to create a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSpec {
    pub name: String,
    pub room_type: RoomType,
    pub width: f64,
    pub length: f64,
    pub ceiling_height: f64,
    pub platform: Platform,
    pub ecosystem: Ecosystem,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
}

/// Fields needed to create a project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSpec {
    pub name: String,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub id: String,
    pub equipment_id: String,
    pub quantity: u32,
    pub unit_cost: f64,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSection {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub items: Vec<QuoteItem>,
    pub subtotal: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTotals {
    pub equipment: f64,
    pub labor: f64,
    pub tax: f64,
    pub total: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub project_id: String,
    pub room_id: String,
    pub status: String,
    pub sections: Vec<QuoteSection>,
    pub totals: QuoteTotals,
    pub created_at: String,
}

/// Fields needed to create a quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSpec {
    pub project_id: String,
    pub room_id: String,
    pub sections: Vec<QuoteSection>,
    pub totals: QuoteTotals,
}
