//! SQLite-backed room, project and quote services.

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::{PlacedEquipment, Project, ProjectSpec, Quote, QuoteSpec, Room, RoomSpec};
use crate::services::{ProjectService, QuoteService, RoomService};

const DRAFT_STATUS: &str = "draft";

#[async_trait]
impl RoomService for Repository {
    async fn create(&self, project_id: &str, spec: &RoomSpec) -> Result<Room, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.begin_write().await?;
        sqlx::query(
            r#"INSERT INTO rooms (
                id, project_id, name, room_type, width, length, ceiling_height,
                platform, ecosystem, tier, placed_equipment, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)"#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(&spec.name)
        .bind(enum_to_text(&spec.room_type)?)
        .bind(spec.width)
        .bind(spec.length)
        .bind(spec.ceiling_height)
        .bind(enum_to_text(&spec.platform)?)
        .bind(enum_to_text(&spec.ecosystem)?)
        .bind(enum_to_text(&spec.tier)?)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Room {
            id,
            project_id: project_id.to_string(),
            name: spec.name.clone(),
            room_type: spec.room_type,
            width: spec.width,
            length: spec.length,
            ceiling_height: spec.ceiling_height,
            platform: spec.platform,
            ecosystem: spec.ecosystem,
            tier: spec.tier,
            placed_equipment: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Room>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, project_id, name, room_type, width, length, ceiling_height,
                      platform, ecosystem, tier, placed_equipment, created_at, updated_at
               FROM rooms WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    async fn set_placed_equipment(
        &self,
        room_id: &str,
        placements: &[PlacedEquipment],
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let placements_json = serde_json::to_string(placements)?;

        let mut tx = self.begin_write().await?;
        let result = sqlx::query("UPDATE rooms SET placed_equipment = ?, updated_at = ? WHERE id = ?")
            .bind(&placements_json)
            .bind(&now)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Room {} not found", room_id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, project_id, name, room_type, width, length, ceiling_height,
                      platform, ecosystem, tier, placed_equipment, created_at, updated_at
               FROM rooms WHERE project_id = ? ORDER BY name"#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(room_from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Room {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectService for Repository {
    async fn create(&self, spec: &ProjectSpec, author_id: &str) -> Result<Project, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.begin_write().await?;
        sqlx::query(
            "INSERT INTO projects (id, name, client_id, client_name, status, created_by, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&spec.name)
        .bind(&spec.client_id)
        .bind(&spec.client_name)
        .bind(DRAFT_STATUS)
        .bind(author_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Project {
            id,
            name: spec.name.clone(),
            client_id: spec.client_id.clone(),
            client_name: spec.client_name.clone(),
            status: DRAFT_STATUS.to_string(),
            created_by: author_id.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, client_id, client_name, status, created_by, created_at FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(|row| Project {
            id: row.get("id"),
            name: row.get("name"),
            client_id: row.get("client_id"),
            client_name: row.get("client_name"),
            status: row.get("status"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl QuoteService for Repository {
    async fn create(&self, spec: &QuoteSpec) -> Result<Quote, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let sections_json = serde_json::to_string(&spec.sections)?;
        let totals_json = serde_json::to_string(&spec.totals)?;

        let mut tx = self.begin_write().await?;
        sqlx::query(
            "INSERT INTO quotes (id, project_id, room_id, status, sections, totals, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&spec.project_id)
        .bind(&spec.room_id)
        .bind(DRAFT_STATUS)
        .bind(&sections_json)
        .bind(&totals_json)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Quote {
            id,
            project_id: spec.project_id.clone(),
            room_id: spec.room_id.clone(),
            status: DRAFT_STATUS.to_string(),
            sections: spec.sections.clone(),
            totals: spec.totals.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Quote>, AppError> {
        let row = sqlx::query(
            "SELECT id, project_id, room_id, status, sections, totals, created_at FROM quotes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(quote_from_row).transpose()
    }
}

// Helper functions for row conversion

fn room_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Room, AppError> {
    let placements_str: String = row.get("placed_equipment");
    let placed_equipment = serde_json::from_str(&placements_str)
        .map_err(|e| AppError::Internal(format!("Corrupt placed equipment: {}", e)))?;

    Ok(Room {
        id: row.get("id"),
        project_id: row.get("project_id"),
        name: row.get("name"),
        room_type: enum_from_text(row.get("room_type"))?,
        width: row.get("width"),
        length: row.get("length"),
        ceiling_height: row.get("ceiling_height"),
        platform: enum_from_text(row.get("platform"))?,
        ecosystem: enum_from_text(row.get("ecosystem"))?,
        tier: enum_from_text(row.get("tier"))?,
        placed_equipment,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn quote_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Quote, AppError> {
    let sections_str: String = row.get("sections");
    let totals_str: String = row.get("totals");

    Ok(Quote {
        id: row.get("id"),
        project_id: row.get("project_id"),
        room_id: row.get("room_id"),
        status: row.get("status"),
        sections: serde_json::from_str(&sections_str)
            .map_err(|e| AppError::Internal(format!("Corrupt quote sections: {}", e)))?,
        totals: serde_json::from_str(&totals_str)
            .map_err(|e| AppError::Internal(format!("Corrupt quote totals: {}", e)))?,
        created_at: row.get("created_at"),
    })
}

/// Store a unit enum as its serde name (e.g. `google_meet`).
fn enum_to_text<T: Serialize>(value: &T) -> Result<String, AppError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(AppError::Internal(format!(
            "Expected a string enum, got {}",
            other
        ))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(text))
        .map_err(|e| AppError::Internal(format!("Unknown stored value: {}", e)))
}
