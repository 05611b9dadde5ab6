//! Database repository for templates and their version history.
//!
//! Version appends run inside a transaction: the version insert and the
//! current-version pointer move either both land or neither does.

use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{
    NewTemplate, RevisionInfo, ScopeBinding, Template, TemplateContent, TemplateFilters,
    TemplateScope, TemplateType, TemplateVersion, UpdateTemplateRequest,
};

/// Summary recorded on the version minted when a template is created.
pub const INITIAL_VERSION_SUMMARY: &str = "Initial version";

/// Everything needed to append one version to a template.
#[derive(Debug, Clone)]
pub struct VersionAppend<'a> {
    pub content: &'a TemplateContent,
    pub created_by: &'a str,
    pub change_summary: Option<&'a str>,
    /// Explicit number to use instead of `current + 1`
    pub forced_number: Option<i64>,
    /// Pointer value the caller expects; mismatch is a conflict
    pub expected_version: Option<i64>,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Open a write transaction that has already bumped the revision.
    ///
    /// The bump is the first statement, so the transaction holds SQLite's write
    /// lock before it reads anything. Under WAL a deferred transaction that
    /// reads first cannot upgrade to a writer once another writer has
    /// committed; it fails with `SQLITE_BUSY` instead of waiting.
    pub(super) async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        let mut tx = self.pool.begin().await?;
        bump_revision_tx(&mut tx).await?;
        Ok(tx)
    }

    // ==================== TEMPLATE OPERATIONS ====================

    /// List templates matching the column-level filters, ordered by name.
    ///
    /// Search, category and content-level filters are applied by the caller.
    pub async fn list_templates(&self, filters: &TemplateFilters) -> Result<Vec<Template>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, template_type, name, description, thumbnail_url, scope,
                      owner_id, team_id, org_id, category_tags, current_version,
                      is_published, is_archived, forked_from_id, created_by,
                      created_at, updated_at
               FROM templates
               WHERE (?1 IS NULL OR template_type = ?1)
                 AND (?2 IS NULL OR scope = ?2)
                 AND (?3 IS NULL OR is_published = ?3)
                 AND (?4 IS NULL OR is_archived = ?4)
                 AND (?5 IS NULL OR org_id = ?5)
                 AND (?6 IS NULL OR team_id = ?6)
                 AND (?7 IS NULL OR owner_id = ?7)
               ORDER BY name, created_at"#,
        )
        .bind(filters.template_type.map(|t| t.as_str()))
        .bind(filters.scope.map(|s| s.as_str()))
        .bind(filters.is_published.map(|b| b as i32))
        .bind(filters.is_archived.map(|b| b as i32))
        .bind(filters.org_id.as_deref())
        .bind(filters.team_id.as_deref())
        .bind(filters.owner_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(template_from_row).collect()
    }

    /// List every template, used to rebuild the search index.
    pub async fn list_all_templates(&self) -> Result<Vec<Template>, AppError> {
        self.list_templates(&TemplateFilters::default()).await
    }

    /// Get a template by ID.
    pub async fn get_template(&self, id: &str) -> Result<Option<Template>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, template_type, name, description, thumbnail_url, scope,
                      owner_id, team_id, org_id, category_tags, current_version,
                      is_published, is_archived, forked_from_id, created_by,
                      created_at, updated_at
               FROM templates WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(template_from_row).transpose()
    }

    /// Insert a template at version 0 and bind its first content version, in one transaction.
    pub async fn create_template(
        &self,
        new: &NewTemplate,
        content: &TemplateContent,
        change_summary: Option<&str>,
    ) -> Result<(Template, TemplateVersion), AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let tags_json = serde_json::to_string(&new.category_tags)?;

        let mut tx = self.begin_write().await?;

        sqlx::query(
            r#"INSERT INTO templates (
                id, template_type, name, description, thumbnail_url, scope,
                owner_id, team_id, org_id, category_tags, current_version,
                is_published, is_archived, forked_from_id, created_by,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(new.template_type.as_str())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.thumbnail_url)
        .bind(new.scope.as_str())
        .bind(&new.owner_id)
        .bind(&new.team_id)
        .bind(&new.org_id)
        .bind(&tags_json)
        .bind(new.is_published as i32)
        .bind(&new.forked_from_id)
        .bind(&new.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let version = append_version_tx(
            &mut tx,
            &id,
            &VersionAppend {
                content,
                created_by: &new.created_by,
                change_summary: Some(change_summary.unwrap_or(INITIAL_VERSION_SUMMARY)),
                forced_number: Some(1),
                expected_version: Some(0),
            },
        )
        .await?;

        tx.commit().await?;

        let template = Template {
            id,
            template_type: new.template_type,
            name: new.name.clone(),
            description: new.description.clone(),
            thumbnail_url: new.thumbnail_url.clone(),
            scope: new.scope,
            owner_id: new.owner_id.clone(),
            team_id: new.team_id.clone(),
            org_id: new.org_id.clone(),
            category_tags: new.category_tags.clone(),
            current_version: version.version_number,
            is_published: new.is_published,
            is_archived: false,
            forked_from_id: new.forked_from_id.clone(),
            created_by: new.created_by.clone(),
            created_at: now.clone(),
            updated_at: version.created_at.clone(),
        };

        Ok((template, version))
    }

    /// Update template metadata. Content is never touched here.
    pub async fn update_template(
        &self,
        id: &str,
        request: &UpdateTemplateRequest,
    ) -> Result<Template, AppError> {
        let existing = self
            .get_template(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))?;

        let now = Utc::now().to_rfc3339();

        let name = request
            .name
            .clone()
            .unwrap_or_else(|| existing.name.clone());
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone());
        let thumbnail_url = request
            .thumbnail_url
            .clone()
            .unwrap_or_else(|| existing.thumbnail_url.clone());
        let category_tags = request
            .category_tags
            .clone()
            .unwrap_or(existing.category_tags.clone());
        let is_published = request.is_published.unwrap_or(existing.is_published);
        let is_archived = request.is_archived.unwrap_or(existing.is_archived);
        let tags_json = serde_json::to_string(&category_tags)?;

        let mut tx = self.begin_write().await?;
        let result = sqlx::query(
            r#"UPDATE templates SET
                name = ?, description = ?, thumbnail_url = ?, category_tags = ?,
                is_published = ?, is_archived = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&name)
        .bind(&description)
        .bind(&thumbnail_url)
        .bind(&tags_json)
        .bind(is_published as i32)
        .bind(is_archived as i32)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Template {} not found", id)));
        }
        tx.commit().await?;

        Ok(Template {
            name,
            description,
            thumbnail_url,
            category_tags,
            is_published,
            is_archived,
            updated_at: now,
            ..existing
        })
    }

    /// Rewrite the scope and ownership columns of a template.
    pub async fn set_scope(&self, id: &str, binding: &ScopeBinding) -> Result<Template, AppError> {
        let now = Utc::now().to_rfc3339();

        let mut tx = self.begin_write().await?;
        let result = sqlx::query(
            "UPDATE templates SET scope = ?, owner_id = ?, team_id = ?, org_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(binding.scope.as_str())
        .bind(&binding.owner_id)
        .bind(&binding.team_id)
        .bind(&binding.org_id)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Template {} not found", id)));
        }
        tx.commit().await?;

        self.get_template(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))
    }

    /// Delete a template together with its version history.
    pub async fn delete_template(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;

        sqlx::query("DELETE FROM template_versions WHERE template_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM templates WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Template {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== VERSION OPERATIONS ====================

    /// Append a version and move the template's pointer to it.
    pub async fn create_version(
        &self,
        template_id: &str,
        append: &VersionAppend<'_>,
    ) -> Result<TemplateVersion, AppError> {
        let mut tx = self.begin_write().await?;
        let version = append_version_tx(&mut tx, template_id, append).await?;
        tx.commit().await?;
        Ok(version)
    }

    /// List all versions of a template, newest first.
    pub async fn list_versions(&self, template_id: &str) -> Result<Vec<TemplateVersion>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, template_id, version_number, content, change_summary, created_by, created_at
               FROM template_versions WHERE template_id = ?
               ORDER BY version_number DESC"#,
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(version_from_row).collect()
    }

    /// Get one version by number.
    pub async fn get_version(
        &self,
        template_id: &str,
        version_number: i64,
    ) -> Result<Option<TemplateVersion>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, template_id, version_number, content, change_summary, created_by, created_at
               FROM template_versions WHERE template_id = ? AND version_number = ?"#,
        )
        .bind(template_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(version_from_row).transpose()
    }

    /// Get the version the template's pointer currently refers to.
    pub async fn get_current_version(
        &self,
        template_id: &str,
    ) -> Result<Option<TemplateVersion>, AppError> {
        let row = sqlx::query(
            r#"SELECT v.id, v.template_id, v.version_number, v.content, v.change_summary,
                      v.created_by, v.created_at
               FROM template_versions v
               JOIN templates t ON t.id = v.template_id AND t.current_version = v.version_number
               WHERE v.template_id = ?"#,
        )
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(version_from_row).transpose()
    }
}

/// Insert a version row and compare-and-swap the template pointer onto it.
///
/// `tx` must come from [`Repository::begin_write`].
async fn append_version_tx(
    tx: &mut Transaction<'_, Sqlite>,
    template_id: &str,
    append: &VersionAppend<'_>,
) -> Result<TemplateVersion, AppError> {
    let row = sqlx::query("SELECT current_version FROM templates WHERE id = ?")
        .bind(template_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Template {} not found", template_id)))?;
    let current: i64 = row.get("current_version");

    if let Some(expected) = append.expected_version {
        if expected != current {
            return Err(AppError::Conflict {
                message: format!(
                    "Version mismatch: expected {}, current {}",
                    expected, current
                ),
                current_version: current,
            });
        }
    }

    let version_number = match append.forced_number {
        Some(forced) if forced <= current => {
            return Err(AppError::Validation(format!(
                "Version {} is not after current version {}",
                forced, current
            )));
        }
        Some(forced) => forced,
        None => current + 1,
    };

    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let content_json = serde_json::to_string(append.content)?;

    sqlx::query(
        r#"INSERT INTO template_versions (
            id, template_id, version_number, content, change_summary, created_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(template_id)
    .bind(version_number)
    .bind(&content_json)
    .bind(append.change_summary)
    .bind(append.created_by)
    .bind(&now)
    .execute(&mut **tx)
    .await
    .map_err(|e| conflict_on_duplicate(e, current))?;

    // Pointer only moves if nobody else moved it since we read it
    let result = sqlx::query(
        "UPDATE templates SET current_version = ?, updated_at = ? WHERE id = ? AND current_version = ?",
    )
    .bind(version_number)
    .bind(&now)
    .bind(template_id)
    .bind(current)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict {
            message: "Concurrent modification detected".to_string(),
            current_version: current,
        });
    }

    Ok(TemplateVersion {
        id,
        template_id: template_id.to_string(),
        version_number,
        content: append.content.clone(),
        change_summary: append.change_summary.map(str::to_string),
        created_by: append.created_by.to_string(),
        created_at: now,
    })
}

async fn bump_revision_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn conflict_on_duplicate(err: sqlx::Error, current: i64) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict {
                message: "Version number already exists".to_string(),
                current_version: current,
            };
        }
    }
    err.into()
}

// Helper functions for row conversion

fn template_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Template, AppError> {
    let type_str: String = row.get("template_type");
    let scope_str: String = row.get("scope");
    let tags_str: String = row.get("category_tags");
    let is_published: i32 = row.get("is_published");
    let is_archived: i32 = row.get("is_archived");

    let template_type = TemplateType::parse(&type_str)
        .ok_or_else(|| AppError::Internal(format!("Unknown template type {}", type_str)))?;
    let scope = TemplateScope::parse(&scope_str)
        .ok_or_else(|| AppError::Internal(format!("Unknown template scope {}", scope_str)))?;

    Ok(Template {
        id: row.get("id"),
        template_type,
        name: row.get("name"),
        description: row.get("description"),
        thumbnail_url: row.get("thumbnail_url"),
        scope,
        owner_id: row.get("owner_id"),
        team_id: row.get("team_id"),
        org_id: row.get("org_id"),
        category_tags: parse_json_array(&tags_str),
        current_version: row.get("current_version"),
        is_published: is_published != 0,
        is_archived: is_archived != 0,
        forked_from_id: row.get("forked_from_id"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn version_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TemplateVersion, AppError> {
    let content_str: String = row.get("content");
    let content: TemplateContent = serde_json::from_str(&content_str)
        .map_err(|e| AppError::Internal(format!("Corrupt version content: {}", e)))?;

    Ok(TemplateVersion {
        id: row.get("id"),
        template_id: row.get("template_id"),
        version_number: row.get("version_number"),
        content,
        change_summary: row.get("change_summary"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    })
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{QuoteSectionConfig, QuoteTemplateContent};
    use tempfile::TempDir;

    async fn test_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn quote_content(section: &str) -> TemplateContent {
        TemplateContent::Quote(QuoteTemplateContent {
            sections: vec![QuoteSectionConfig {
                name: section.to_string(),
                category: "video".to_string(),
                default_margin_percent: 25.0,
            }],
            labor_rates: vec![],
            tax_settings: Default::default(),
            terms: String::new(),
        })
    }

    fn new_template() -> NewTemplate {
        NewTemplate {
            template_type: TemplateType::Quote,
            name: "Standard Quote".to_string(),
            description: None,
            thumbnail_url: None,
            scope: TemplateScope::Personal,
            owner_id: Some("u1".to_string()),
            team_id: None,
            org_id: None,
            category_tags: vec!["quotes".to_string()],
            is_published: false,
            forked_from_id: None,
            created_by: "u1".to_string(),
        }
    }

    fn append<'a>(content: &'a TemplateContent) -> VersionAppend<'a> {
        VersionAppend {
            content,
            created_by: "u1",
            change_summary: None,
            forced_number: None,
            expected_version: None,
        }
    }

    #[tokio::test]
    async fn test_create_template_binds_version_one() {
        let (repo, _dir) = test_repo().await;
        let content = quote_content("Video");

        let (template, version) = repo
            .create_template(&new_template(), &content, None)
            .await
            .unwrap();

        assert_eq!(template.current_version, 1);
        assert_eq!(version.version_number, 1);
        assert_eq!(version.change_summary.as_deref(), Some(INITIAL_VERSION_SUMMARY));

        let stored = repo.get_template(&template.id).await.unwrap().unwrap();
        assert_eq!(stored.current_version, 1);
        assert_eq!(stored.category_tags, vec!["quotes".to_string()]);

        let current = repo.get_current_version(&template.id).await.unwrap().unwrap();
        assert_eq!(current.content, content);
    }

    #[tokio::test]
    async fn test_versions_increase_without_gaps() {
        let (repo, _dir) = test_repo().await;
        let (template, _) = repo
            .create_template(&new_template(), &quote_content("v1"), None)
            .await
            .unwrap();

        for name in ["v2", "v3", "v4"] {
            let content = quote_content(name);
            repo.create_version(&template.id, &append(&content))
                .await
                .unwrap();
        }

        let numbers: Vec<i64> = repo
            .list_versions(&template.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);

        let stored = repo.get_template(&template.id).await.unwrap().unwrap();
        assert_eq!(stored.current_version, 4);
    }

    #[tokio::test]
    async fn test_stale_expected_version_conflicts() {
        let (repo, _dir) = test_repo().await;
        let (template, _) = repo
            .create_template(&new_template(), &quote_content("v1"), None)
            .await
            .unwrap();

        let content = quote_content("v2");
        let err = repo
            .create_version(
                &template.id,
                &VersionAppend {
                    expected_version: Some(0),
                    ..append(&content)
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { current_version: 1, .. }));
        assert!(repo.get_version(&template.id, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forced_number_must_move_forward() {
        let (repo, _dir) = test_repo().await;
        let (template, _) = repo
            .create_template(&new_template(), &quote_content("v1"), None)
            .await
            .unwrap();

        let content = quote_content("again");
        let err = repo
            .create_version(
                &template.id,
                &VersionAppend {
                    forced_number: Some(1),
                    ..append(&content)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_version_for_missing_template() {
        let (repo, _dir) = test_repo().await;
        let content = quote_content("v1");

        let err = repo
            .create_version("missing", &append(&content))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_history() {
        let (repo, _dir) = test_repo().await;
        let (template, _) = repo
            .create_template(&new_template(), &quote_content("v1"), None)
            .await
            .unwrap();

        repo.delete_template(&template.id).await.unwrap();

        assert!(repo.get_template(&template.id).await.unwrap().is_none());
        assert!(repo.list_versions(&template.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_template(&template.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_columns() {
        let (repo, _dir) = test_repo().await;
        repo.create_template(&new_template(), &quote_content("v1"), None)
            .await
            .unwrap();
        let (published, _) = repo
            .create_template(
                &NewTemplate {
                    name: "Published Quote".to_string(),
                    is_published: true,
                    ..new_template()
                },
                &quote_content("v1"),
                None,
            )
            .await
            .unwrap();

        let filters = TemplateFilters {
            is_published: Some(true),
            ..Default::default()
        };
        let listed = repo.list_templates(&filters).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, published.id);

        let filters = TemplateFilters {
            template_type: Some(TemplateType::Room),
            ..Default::default()
        };
        assert!(repo.list_templates(&filters).await.unwrap().is_empty());
    }
}
