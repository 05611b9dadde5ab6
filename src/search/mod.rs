//! Tantivy-based search index module.
//!
//! Provides full-text search over template names, descriptions and category tags.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Template;

/// Field boost values.
const BOOST_NAME: f32 = 10.0;
const BOOST_TAGS: f32 = 6.0;
const BOOST_DESCRIPTION: f32 = 4.0;

/// Search index schema fields.
struct SearchFields {
    template_id: Field,
    name: Field,
    description: Field,
    tags: Field,
}

/// Tantivy search index for templates.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        // Raw id so documents can be replaced by term
        let template_id = schema_builder.add_text_field("template_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT | STORED);
        let description = schema_builder.add_text_field("description", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            template_id,
            name,
            description,
            tags,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from templates.
    pub async fn rebuild(&self, templates: &[Template]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for template in templates {
            writer.add_document(self.create_document(template))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} templates", templates.len());
        Ok(())
    }

    /// Index or re-index a single template.
    pub async fn index_template(&self, template: &Template) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.template_id, &template.id);
        writer.delete_term(term);
        writer.add_document(self.create_document(template))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a template from the index.
    pub async fn remove_template(&self, template_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.template_id, template_id);
        writer.delete_term(term);
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// IDs of templates matching the query, most relevant first.
    ///
    /// Query syntax errors are tolerated; whatever parses is searched.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<String>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.name, BOOST_NAME),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            let (field_query, _errors) = field_parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let combined_query = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit.max(1)))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .filter_map(|(_score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                Some(doc.get_first(self.fields.template_id)?.as_str()?.to_string())
            })
            .collect();

        Ok(results)
    }

    /// IDs of every template matching the query, for narrowing a listing.
    pub fn matching_ids(&self, query_str: &str) -> Result<HashSet<String>, AppError> {
        let limit = self.reader.searcher().num_docs() as usize;
        Ok(self.search(query_str, limit)?.into_iter().collect())
    }

    fn create_document(&self, template: &Template) -> TantivyDocument {
        doc!(
            self.fields.template_id => template.id.clone(),
            self.fields.name => template.name.clone(),
            self.fields.description => template.description.clone().unwrap_or_default(),
            self.fields.tags => template.category_tags.join(" ")
        )
    }
}
