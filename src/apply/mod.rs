//! Template application engine.
//!
//! Instantiates a template's current content into new rooms, projects and
//! quotes. Dispatch is on the content's type tag; every branch checks its
//! required input before the first write.

mod ids;
mod layout;
mod saga;

use std::sync::Arc;

use ids::{prefixed_id, PLACEMENT_PREFIX, SECTION_PREFIX};
use layout::grid_positions;
use saga::Saga;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    ApplyResult, ApplyTemplateInput, EquipmentPackageContent, PlacedEquipment,
    ProjectRoomEntry, ProjectSpec, ProjectTemplateContent, QuoteSection, QuoteSpec,
    QuoteTemplateContent, QuoteTotals, Room, RoomSpec, RoomTemplateContent,
    TemplateContent, TemplateEquipmentPlacement, TemplateType,
};
use crate::services::{ProjectService, QuoteService, RoomService};

/// Applies templates by creating entities through the collaborator services.
pub struct ApplicationEngine {
    repo: Arc<Repository>,
    rooms: Arc<dyn RoomService>,
    projects: Arc<dyn ProjectService>,
    quotes: Arc<dyn QuoteService>,
    grid_spacing: f64,
}

impl ApplicationEngine {
    pub fn new(
        repo: Arc<Repository>,
        rooms: Arc<dyn RoomService>,
        projects: Arc<dyn ProjectService>,
        quotes: Arc<dyn QuoteService>,
        grid_spacing: f64,
    ) -> Self {
        Self {
            repo,
            rooms,
            projects,
            quotes,
            grid_spacing,
        }
    }

    /// Instantiate the template's current content and report what was created.
    pub async fn apply_template(
        &self,
        template_id: &str,
        input: &ApplyTemplateInput,
    ) -> Result<ApplyResult, AppError> {
        let template = self
            .repo
            .get_template(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", template_id)))?;

        let version = self
            .repo
            .get_current_version(template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Template {} has no content", template_id))
            })?;

        tracing::info!(
            "Applying {} template {} at version {}",
            version.content.template_type().as_str(),
            template.id,
            version.version_number
        );

        match &version.content {
            TemplateContent::Room(content) => {
                let project_id = required(&input.project_id, "projectId", TemplateType::Room)?;
                let name = required(&input.name, "name", TemplateType::Room)?;
                self.apply_room(content, project_id, name).await
            }
            TemplateContent::EquipmentPackage(content) => {
                let room_id = required(&input.room_id, "roomId", TemplateType::EquipmentPackage)?;
                self.apply_equipment_package(content, room_id).await
            }
            TemplateContent::Project(content) => {
                let name = required(&input.name, "name", TemplateType::Project)?;
                let author = required(&input.created_by, "createdBy", TemplateType::Project)?;
                let spec = ProjectSpec {
                    name: name.to_string(),
                    client_id: input.client_id.clone(),
                    client_name: input.client_name.clone(),
                };
                self.apply_project(content, &spec, author).await
            }
            TemplateContent::Quote(content) => {
                let project_id = required(&input.project_id, "projectId", TemplateType::Quote)?;
                let room_id = required(&input.room_id, "roomId", TemplateType::Quote)?;
                self.apply_quote(content, project_id, room_id).await
            }
        }
    }

    async fn apply_room(
        &self,
        content: &RoomTemplateContent,
        project_id: &str,
        name: &str,
    ) -> Result<ApplyResult, AppError> {
        let mut saga = Saga::new();

        match self
            .instantiate_room(&mut saga, project_id, name, content)
            .await
        {
            Ok(room) => {
                saga.commit();
                Ok(ApplyResult::Room {
                    room_id: room.id,
                    project_id: project_id.to_string(),
                })
            }
            Err(e) => Err(saga.abort(e).await),
        }
    }

    /// Append the package's items to an existing room.
    ///
    /// Read-merge-write without a lock: two concurrent applies to the same room
    /// can overwrite each other's additions.
    async fn apply_equipment_package(
        &self,
        content: &EquipmentPackageContent,
        room_id: &str,
    ) -> Result<ApplyResult, AppError> {
        let room = self
            .rooms
            .get_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?;

        let additions = package_placements(content, &room, self.grid_spacing);
        if !additions.is_empty() {
            let mut merged = room.placed_equipment.clone();
            merged.extend(additions);
            self.rooms.set_placed_equipment(&room.id, &merged).await?;
        }

        Ok(ApplyResult::EquipmentPackage {
            room_id: room.id,
            project_id: room.project_id,
        })
    }

    async fn apply_project(
        &self,
        content: &ProjectTemplateContent,
        spec: &ProjectSpec,
        author: &str,
    ) -> Result<ApplyResult, AppError> {
        // Resolve every reference before the first write
        let mut plan: Vec<(&ProjectRoomEntry, RoomTemplateContent)> = Vec::new();
        for entry in &content.rooms {
            match self.resolve_room_template(&entry.template_id).await? {
                Some(room_content) => plan.push((entry, room_content)),
                None => tracing::debug!(
                    "Skipping project room {}: {} is not a room template",
                    entry.default_name,
                    entry.template_id
                ),
            }
        }

        let project = self.projects.create(spec, author).await?;

        let mut saga = Saga::new();
        let projects = Arc::clone(&self.projects);
        let created_project_id = project.id.clone();
        saga.record(format!("project {}", project.id), async move {
            projects.delete(&created_project_id).await
        });

        match self.instantiate_rooms(&mut saga, &project.id, &plan).await {
            Ok(room_count) => {
                saga.commit();
                tracing::info!("Created project {} with {} room(s)", project.id, room_count);
                Ok(ApplyResult::Project {
                    project_id: project.id,
                })
            }
            Err(e) => Err(saga.abort(e).await),
        }
    }

    async fn apply_quote(
        &self,
        content: &QuoteTemplateContent,
        project_id: &str,
        room_id: &str,
    ) -> Result<ApplyResult, AppError> {
        let spec = quote_shell(content, project_id, room_id);
        let quote = self.quotes.create(&spec).await?;

        Ok(ApplyResult::Quote {
            quote_id: quote.id,
            room_id: quote.room_id,
            project_id: quote.project_id,
        })
    }

    async fn instantiate_rooms(
        &self,
        saga: &mut Saga,
        project_id: &str,
        plan: &[(&ProjectRoomEntry, RoomTemplateContent)],
    ) -> Result<usize, AppError> {
        let mut created = 0;
        for (entry, content) in plan {
            for index in 0..entry.quantity {
                let name = room_instance_name(&entry.default_name, index, entry.quantity);
                self.instantiate_room(saga, project_id, &name, content).await?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Create a room and give it its own copy of the template's equipment.
    async fn instantiate_room(
        &self,
        saga: &mut Saga,
        project_id: &str,
        name: &str,
        content: &RoomTemplateContent,
    ) -> Result<Room, AppError> {
        let room = self
            .rooms
            .create(project_id, &room_spec(name, content))
            .await?;

        let rooms = Arc::clone(&self.rooms);
        let created_room_id = room.id.clone();
        saga.record(format!("room {}", room.id), async move {
            rooms.delete(&created_room_id).await
        });

        let placements = copy_placements(&content.placed_equipment);
        if !placements.is_empty() {
            self.rooms
                .set_placed_equipment(&room.id, &placements)
                .await?;
        }

        Ok(room)
    }

    /// Current room content of a referenced template, or `None` when the
    /// reference is dangling or points at another template type.
    async fn resolve_room_template(
        &self,
        template_id: &str,
    ) -> Result<Option<RoomTemplateContent>, AppError> {
        let Some(template) = self.repo.get_template(template_id).await? else {
            return Ok(None);
        };
        if template.template_type != TemplateType::Room {
            return Ok(None);
        }

        Ok(self
            .repo
            .get_current_version(template_id)
            .await?
            .and_then(|v| v.content.as_room().cloned()))
    }
}

fn required<'a>(
    value: &'a Option<String>,
    field: &str,
    kind: TemplateType,
) -> Result<&'a str, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!(
            "{} is required to apply a {} template",
            field,
            kind.as_str()
        ))),
    }
}

fn room_spec(name: &str, content: &RoomTemplateContent) -> RoomSpec {
    RoomSpec {
        name: name.to_string(),
        room_type: content.room_type,
        width: content.width,
        length: content.length,
        ceiling_height: content.ceiling_height,
        platform: content.platform,
        ecosystem: content.ecosystem,
        tier: content.tier,
    }
}

/// `"Huddle 2"` for the second of several rooms, plain `"Huddle"` for a single one.
pub fn room_instance_name(default_name: &str, index: u32, quantity: u32) -> String {
    if quantity > 1 {
        format!("{} {}", default_name, index + 1)
    } else {
        default_name.to_string()
    }
}

/// Fresh placements at the template's stored positions.
pub fn copy_placements(items: &[TemplateEquipmentPlacement]) -> Vec<PlacedEquipment> {
    items
        .iter()
        .map(|item| PlacedEquipment {
            id: prefixed_id(PLACEMENT_PREFIX),
            equipment_id: item.equipment_id.clone(),
            x: item.x,
            y: item.y,
            rotation: item.rotation,
            label: item.label.clone(),
            notes: None,
        })
        .collect()
}

/// One placement per unit of every package item, laid out on the room grid.
pub fn package_placements(
    content: &EquipmentPackageContent,
    room: &Room,
    spacing: f64,
) -> Vec<PlacedEquipment> {
    let positions = grid_positions(content.slot_count(), room.width, room.length, spacing);

    content
        .items
        .iter()
        .flat_map(|item| std::iter::repeat(item).take(item.quantity as usize))
        .zip(positions)
        .map(|(item, position)| PlacedEquipment {
            id: prefixed_id(PLACEMENT_PREFIX),
            equipment_id: item.equipment_id.clone(),
            x: position.x,
            y: position.y,
            rotation: 0.0,
            label: None,
            notes: item.notes.clone(),
        })
        .collect()
}

/// Quote scaffolding: sections only. Margins, labor rates and tax settings are
/// configured on the quote after creation.
pub fn quote_shell(content: &QuoteTemplateContent, project_id: &str, room_id: &str) -> QuoteSpec {
    QuoteSpec {
        project_id: project_id.to_string(),
        room_id: room_id.to_string(),
        sections: content
            .sections
            .iter()
            .map(|section| QuoteSection {
                id: prefixed_id(SECTION_PREFIX),
                name: section.name.clone(),
                category: section.category.clone(),
                items: Vec::new(),
                subtotal: 0.0,
            })
            .collect(),
        totals: QuoteTotals::default(),
    }
}
