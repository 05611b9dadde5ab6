//! Template lifecycle: creation, metadata edits, content versions, forks and
//! scope promotion.
//!
//! System templates are curated and read-only here; they can only be copied
//! out through fork or duplicate.

use std::sync::Arc;

use crate::db::{Repository, VersionAppend};
use crate::errors::AppError;
use crate::models::{
    CreateTemplateRequest, DuplicateTemplateRequest, ForkTemplateRequest, NewTemplate,
    PromoteTemplateRequest, ScopeBinding, Template, TemplateFilters, TemplateScope,
    TemplateType, TemplateVersion, TemplateWithVersion, UpdateContentRequest,
    UpdateTemplateRequest,
};
use crate::search::SearchIndex;

/// Template operations over the repository and the search index.
pub struct TemplateService {
    repo: Arc<Repository>,
    search: Arc<SearchIndex>,
}

impl TemplateService {
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>) -> Self {
        Self { repo, search }
    }

    // ==================== QUERIES ====================

    /// List templates, ordered by name.
    ///
    /// `platform` and `tier` only match room templates and are checked against
    /// each candidate's current content.
    pub async fn get_all(&self, filters: &TemplateFilters) -> Result<Vec<Template>, AppError> {
        let mut templates = self.repo.list_templates(filters).await?;

        if let Some(query) = non_blank(filters.search.as_deref()) {
            let ids = self.search.matching_ids(query)?;
            templates.retain(|t| ids.contains(&t.id));
        }

        if let Some(category) = non_blank(filters.category.as_deref()) {
            templates.retain(|t| {
                t.category_tags
                    .iter()
                    .any(|tag| tag.eq_ignore_ascii_case(category))
            });
        }

        if filters.needs_content() {
            let mut matched = Vec::new();
            for template in templates {
                if template.template_type != TemplateType::Room {
                    continue;
                }
                let Some(version) = self.repo.get_current_version(&template.id).await? else {
                    continue;
                };
                let Some(room) = version.content.as_room() else {
                    continue;
                };
                let platform_ok = filters.platform.map_or(true, |p| room.platform == p);
                let tier_ok = filters.tier.map_or(true, |t| room.tier == t);
                if platform_ok && tier_ok {
                    matched.push(template);
                }
            }
            templates = matched;
        }

        Ok(templates)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Template, AppError> {
        self.repo
            .get_template(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))
    }

    /// Template plus the content it currently points at.
    pub async fn get_with_version(&self, id: &str) -> Result<TemplateWithVersion, AppError> {
        let template = self.get_by_id(id).await?;
        let current_version_data = self.repo.get_current_version(id).await?;

        Ok(TemplateWithVersion {
            template,
            current_version_data,
        })
    }

    // ==================== LIFECYCLE ====================

    pub async fn create(&self, request: CreateTemplateRequest) -> Result<Template, AppError> {
        let name = required_text(&request.name, "Template name")?;
        let author = required_text(&request.created_by, "createdBy")?;
        request.content.validate_for(request.template_type)?;

        let binding = normalize_scope(
            request.scope.unwrap_or(TemplateScope::Personal),
            request.owner_id.clone(),
            request.team_id.clone(),
            request.org_id.clone(),
            author,
        )?;

        let new = NewTemplate {
            template_type: request.template_type,
            name: name.to_string(),
            description: request.description.clone(),
            thumbnail_url: request.thumbnail_url.clone(),
            scope: binding.scope,
            owner_id: binding.owner_id,
            team_id: binding.team_id,
            org_id: binding.org_id,
            category_tags: request.category_tags.clone().unwrap_or_default(),
            is_published: request.is_published.unwrap_or(false),
            forked_from_id: None,
            created_by: author.to_string(),
        };

        let (template, _) = self
            .repo
            .create_template(&new, &request.content, request.change_summary.as_deref())
            .await?;

        tracing::info!(
            "Created {} template {} ({})",
            template.template_type.as_str(),
            template.id,
            template.scope.as_str()
        );
        self.reindex(&template).await;
        Ok(template)
    }

    /// Edit metadata. Content changes go through [`Self::update_content`].
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateTemplateRequest,
    ) -> Result<Template, AppError> {
        let existing = self.get_by_id(id).await?;
        ensure_mutable(&existing)?;
        if let Some(name) = &request.name {
            required_text(name, "Template name")?;
        }

        let template = self.repo.update_template(id, request).await?;
        self.reindex(&template).await;
        Ok(template)
    }

    /// Append a new content version and move the template onto it.
    pub async fn update_content(
        &self,
        id: &str,
        request: &UpdateContentRequest,
    ) -> Result<TemplateVersion, AppError> {
        let template = self.get_by_id(id).await?;
        ensure_mutable(&template)?;
        let author = required_text(&request.created_by, "createdBy")?;
        request.content.validate_for(template.template_type)?;

        let version = self
            .repo
            .create_version(
                id,
                &VersionAppend {
                    content: &request.content,
                    created_by: author,
                    change_summary: request.change_summary.as_deref(),
                    forced_number: None,
                    expected_version: request.expected_version,
                },
            )
            .await?;

        tracing::info!("Template {} now at version {}", id, version.version_number);
        Ok(version)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let template = self.get_by_id(id).await?;
        ensure_mutable(&template)?;

        self.repo.delete_template(id).await?;
        if let Err(e) = self.search.remove_template(id).await {
            tracing::warn!("Failed to remove template {} from search index: {}", id, e);
        }

        tracing::info!("Deleted template {}", id);
        Ok(())
    }

    pub async fn archive(&self, id: &str) -> Result<Template, AppError> {
        self.update(
            id,
            &UpdateTemplateRequest {
                is_archived: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn unarchive(&self, id: &str) -> Result<Template, AppError> {
        self.update(
            id,
            &UpdateTemplateRequest {
                is_archived: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn publish(&self, id: &str) -> Result<Template, AppError> {
        self.update(
            id,
            &UpdateTemplateRequest {
                is_published: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn unpublish(&self, id: &str) -> Result<Template, AppError> {
        self.update(
            id,
            &UpdateTemplateRequest {
                is_published: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Start a new lineage from the source's current content.
    pub async fn fork(
        &self,
        source_id: &str,
        request: &ForkTemplateRequest,
    ) -> Result<Template, AppError> {
        let name = required_text(&request.name, "Template name")?;
        let author = required_text(&request.created_by, "createdBy")?;
        let source = self.get_by_id(source_id).await?;
        let content = self.current_content(&source).await?;

        let scope = request.scope.unwrap_or(TemplateScope::Personal);
        if scope == TemplateScope::System {
            return Err(AppError::Validation(
                "Forks can only be created in personal, team or org scope".to_string(),
            ));
        }
        let binding = normalize_scope(
            scope,
            None,
            request.team_id.clone(),
            non_empty(request.org_id.clone()).or_else(|| source.org_id.clone()),
            author,
        )?;

        let new = NewTemplate {
            template_type: source.template_type,
            name: name.to_string(),
            description: request
                .description
                .clone()
                .or_else(|| source.description.clone()),
            thumbnail_url: source.thumbnail_url.clone(),
            scope: binding.scope,
            owner_id: binding.owner_id,
            team_id: binding.team_id,
            org_id: binding.org_id,
            category_tags: source.category_tags.clone(),
            is_published: false,
            forked_from_id: Some(source.id.clone()),
            created_by: author.to_string(),
        };

        let summary = format!(
            "Forked from {} version {}",
            source.name, content.version_number
        );
        let (template, _) = self
            .repo
            .create_template(&new, &content.content, Some(&summary))
            .await?;

        tracing::info!("Forked template {} into {}", source.id, template.id);
        self.reindex(&template).await;
        Ok(template)
    }

    /// Copy the source under a new name, keeping its scope binding.
    ///
    /// A copy of a system template lands in the author's personal scope, in the
    /// organization named by the request.
    pub async fn duplicate(
        &self,
        source_id: &str,
        request: &DuplicateTemplateRequest,
    ) -> Result<Template, AppError> {
        let name = required_text(&request.name, "Template name")?;
        let author = required_text(&request.created_by, "createdBy")?;
        let source = self.get_by_id(source_id).await?;
        let content = self.current_content(&source).await?;

        let binding = if source.is_system() {
            normalize_scope(
                TemplateScope::Personal,
                None,
                None,
                request.org_id.clone(),
                author,
            )?
        } else {
            let owner_id = match source.scope {
                TemplateScope::Personal => Some(author.to_string()),
                _ => None,
            };
            normalize_scope(
                source.scope,
                owner_id,
                source.team_id.clone(),
                source.org_id.clone(),
                author,
            )?
        };

        let new = NewTemplate {
            template_type: source.template_type,
            name: name.to_string(),
            description: source.description.clone(),
            thumbnail_url: source.thumbnail_url.clone(),
            scope: binding.scope,
            owner_id: binding.owner_id,
            team_id: binding.team_id,
            org_id: binding.org_id,
            category_tags: source.category_tags.clone(),
            is_published: false,
            forked_from_id: None,
            created_by: author.to_string(),
        };

        let summary = format!("Duplicated from {}", source.name);
        let (template, _) = self
            .repo
            .create_template(&new, &content.content, Some(&summary))
            .await?;

        tracing::info!("Duplicated template {} as {}", source.id, template.id);
        self.reindex(&template).await;
        Ok(template)
    }

    /// Widen a template's visibility along personal → team → org.
    pub async fn promote(
        &self,
        id: &str,
        request: &PromoteTemplateRequest,
    ) -> Result<Template, AppError> {
        let template = self.get_by_id(id).await?;
        ensure_mutable(&template)?;

        if !matches!(request.scope, TemplateScope::Team | TemplateScope::Org) {
            return Err(AppError::Validation(format!(
                "Templates can only be promoted to team or org scope, not {}",
                request.scope.as_str()
            )));
        }
        if request.scope.rank() <= template.scope.rank() {
            return Err(AppError::Validation(format!(
                "Cannot promote a {} template to {}",
                template.scope.as_str(),
                request.scope.as_str()
            )));
        }

        // The organization never changes; only narrower references are dropped
        let team_id = match request.scope {
            TemplateScope::Team => request.team_id.clone(),
            _ => None,
        };
        let binding = normalize_scope(
            request.scope,
            None,
            team_id,
            template.org_id.clone(),
            &template.created_by,
        )?;

        let promoted = self.repo.set_scope(id, &binding).await?;
        tracing::info!(
            "Promoted template {} from {} to {}",
            id,
            template.scope.as_str(),
            promoted.scope.as_str()
        );
        self.reindex(&promoted).await;
        Ok(promoted)
    }

    // ==================== VERSIONS ====================

    /// Full history, newest first.
    pub async fn get_versions(&self, id: &str) -> Result<Vec<TemplateVersion>, AppError> {
        self.get_by_id(id).await?;
        self.repo.list_versions(id).await
    }

    pub async fn get_version(
        &self,
        id: &str,
        version_number: i64,
    ) -> Result<TemplateVersion, AppError> {
        self.repo
            .get_version(id, version_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Version {} of template {} not found",
                    version_number, id
                ))
            })
    }

    pub async fn get_current_version(&self, id: &str) -> Result<TemplateVersion, AppError> {
        let template = self.get_by_id(id).await?;
        self.current_content(&template).await
    }

    /// Re-append an old version's content as the newest version.
    pub async fn restore_version(
        &self,
        id: &str,
        version_number: i64,
        author: &str,
    ) -> Result<TemplateVersion, AppError> {
        let author = required_text(author, "createdBy")?;
        let template = self.get_by_id(id).await?;
        ensure_mutable(&template)?;
        let old = self.get_version(id, version_number).await?;

        let summary = format!("Restored from version {}", version_number);
        let version = self
            .repo
            .create_version(
                id,
                &VersionAppend {
                    content: &old.content,
                    created_by: author,
                    change_summary: Some(&summary),
                    forced_number: None,
                    expected_version: None,
                },
            )
            .await?;

        tracing::info!(
            "Restored template {} version {} as version {}",
            id,
            version_number,
            version.version_number
        );
        Ok(version)
    }

    async fn current_content(&self, template: &Template) -> Result<TemplateVersion, AppError> {
        self.repo
            .get_current_version(&template.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Template {} has no content", template.id))
            })
    }

    async fn reindex(&self, template: &Template) {
        if let Err(e) = self.search.index_template(template).await {
            tracing::warn!("Failed to index template {}: {}", template.id, e);
        }
    }
}

/// Resolve the ownership columns a scope requires.
///
/// Every template outside the system scope belongs to an organization.
pub fn normalize_scope(
    scope: TemplateScope,
    owner_id: Option<String>,
    team_id: Option<String>,
    org_id: Option<String>,
    author: &str,
) -> Result<ScopeBinding, AppError> {
    if scope == TemplateScope::System {
        return Ok(ScopeBinding {
            scope,
            owner_id: None,
            team_id: None,
            org_id: None,
        });
    }

    let org_id = non_empty(org_id).ok_or_else(|| {
        AppError::Validation(format!("orgId is required for {} scope", scope.as_str()))
    })?;

    match scope {
        TemplateScope::Personal => Ok(ScopeBinding {
            scope,
            owner_id: Some(non_empty(owner_id).unwrap_or_else(|| author.to_string())),
            team_id: None,
            org_id: Some(org_id),
        }),
        TemplateScope::Team => {
            let team_id = non_empty(team_id).ok_or_else(|| {
                AppError::Validation("teamId is required for team scope".to_string())
            })?;
            Ok(ScopeBinding {
                scope,
                owner_id: None,
                team_id: Some(team_id),
                org_id: Some(org_id),
            })
        }
        _ => Ok(ScopeBinding {
            scope,
            owner_id: None,
            team_id: None,
            org_id: Some(org_id),
        }),
    }
}

fn ensure_mutable(template: &Template) -> Result<(), AppError> {
    if template.is_system() {
        return Err(AppError::Validation(format!(
            "System template {} is read-only; fork or duplicate it instead",
            template.id
        )));
    }
    Ok(())
}

fn required_text<'a>(value: &'a str, label: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    Ok(trimmed)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
