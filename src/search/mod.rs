//! Tantivy-based search index module.
//!
//! Provides full-text search over recipes with field boosting. SQLite stays
//! the source of truth; the index only maps query text to recipe ids and is
//! rebuilt from the database at startup.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Recipe, MAX_PAGE_DEPTH};

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_INGREDIENTS: f32 = 7.0;
const BOOST_CATEGORY: f32 = 6.0;
const BOOST_DESCRIPTION: f32 = 5.0;
const BOOST_NOTES: f32 = 2.0;

/// A matching recipe id with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub recipe_id: String,
    pub score: f32,
}

/// One page of hits plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

/// Search index schema fields.
struct SearchFields {
    recipe_id: Field,
    title: Field,
    description: Field,
    ingredients: Field,
    category: Field,
    notes: Field,
}

/// Tantivy search index for recipes.
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
        let recipe_id = schema_builder.add_text_field("recipe_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let ingredients = schema_builder.add_text_field("ingredients", TEXT);
        let category = schema_builder.add_text_field("category", TEXT);
        let notes = schema_builder.add_text_field("notes", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            recipe_id,
            title,
            description,
            ingredients,
            category,
            notes,
        };

        // Try to open existing index or create new one
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

    /// Rebuild the entire index from the given recipes.
    pub async fn rebuild(&self, recipes: &[Recipe]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for recipe in recipes {
            writer.add_document(self.create_document(recipe))?;
        }
        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} recipes", recipes.len());
        Ok(())
    }

    /// Index a single recipe, replacing any earlier version of it.
    pub async fn index_recipe(&self, recipe: &Recipe) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.recipe_id, &recipe.id));
        writer.add_document(self.create_document(recipe))?;
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Remove a recipe from the index.
    pub async fn remove_recipe(&self, recipe_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.recipe_id, recipe_id));
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Search for recipes matching the query.
    ///
    /// Query syntax errors are tolerated: the parseable part of the query is used.
    /// A window reaching past [`MAX_PAGE_DEPTH`] hits is rejected.
    pub fn search(&self, query_str: &str, limit: usize, offset: usize) -> Result<SearchPage, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(SearchPage::default());
        }
        let depth = offset
            .checked_add(limit)
            .filter(|depth| *depth <= MAX_PAGE_DEPTH as usize)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Search results are limited to the first {} matches",
                    MAX_PAGE_DEPTH
                ))
            })?;

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.ingredients, BOOST_INGREDIENTS),
            (self.fields.category, BOOST_CATEGORY),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.notes, BOOST_NOTES),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            let (field_query, _errors) = field_parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let combined_query = BooleanQuery::new(subqueries);

        let (top_docs, total) = searcher
            .search(
                &combined_query,
                &(TopDocs::with_limit(depth), Count),
            )
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let hits = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let recipe_id = doc.get_first(self.fields.recipe_id)?.as_str()?.to_string();
                Some(SearchHit { recipe_id, score })
            })
            .collect();

        Ok(SearchPage { hits, total })
    }

    fn create_document(&self, recipe: &Recipe) -> TantivyDocument {
        let ingredients = recipe
            .ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.recipe_id => recipe.id.clone(),
            self.fields.title => recipe.title.clone(),
            self.fields.description => recipe.description.clone(),
            self.fields.ingredients => ingredients,
            self.fields.category => recipe.category.as_str().to_string(),
            self.fields.notes => recipe.notes.clone().unwrap_or_default()
        )
    }
}
