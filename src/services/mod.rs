//! Collaborator services the application engine creates entities through.
//!
//! The engine owns nothing it creates: rooms, projects and quotes belong to
//! these services after the call returns. `Repository` implements all three
//! against SQLite; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{PlacedEquipment, Project, ProjectSpec, Quote, QuoteSpec, Room, RoomSpec};

#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create(&self, project_id: &str, spec: &RoomSpec) -> Result<Room, AppError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Room>, AppError>;

    /// Replace the room's placed-equipment list.
    async fn set_placed_equipment(
        &self,
        room_id: &str,
        placements: &[PlacedEquipment],
    ) -> Result<(), AppError>;

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Room>, AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn create(&self, spec: &ProjectSpec, author_id: &str) -> Result<Project, AppError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Project>, AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn create(&self, spec: &QuoteSpec) -> Result<Quote, AppError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Quote>, AppError>;
}
