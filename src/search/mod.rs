//! Tantivy-based search index module.
//!
//! Full-text search over blog posts with field boosting, plus exact-match
//! filters on tag and author username.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Blog;

/// Field boosts, strongest first.
const BOOST_TITLE: f32 = 10.0;
const BOOST_TAGS: f32 = 6.0;
const BOOST_USERNAME: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 2.0;

/// Deepest result a search may page to.
pub const MAX_SEARCH_OFFSET: usize = 10_000;

/// A single search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub blog_id: String,
    pub score: f32,
}

/// One page of hits and the number of matching posts overall.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// Parameters of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

struct SearchFields {
    blog_id: Field,
    title: Field,
    tags: Field,
    username: Field,
    description: Field,
    tag_exact: Field,
    author_exact: Field,
}

/// Tantivy search index for blog posts.
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
        let blog_id = schema_builder.add_text_field("blog_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let username = schema_builder.add_text_field("username", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let tag_exact = schema_builder.add_text_field("tag_exact", STRING);
        let author_exact = schema_builder.add_text_field("author_exact", STRING);
        let schema = schema_builder.build();

        let fields = SearchFields {
            blog_id,
            title,
            tags,
            username,
            description,
            tag_exact,
            author_exact,
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

    /// Replace the whole index with the given posts.
    pub async fn rebuild(&self, blogs: &[Blog]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for blog in blogs {
            writer.add_document(self.create_document(blog))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} blogs", blogs.len());
        Ok(())
    }

    /// Index or re-index a single post.
    pub async fn index_blog(&self, blog: &Blog) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.blog_id, &blog.id));
        writer.add_document(self.create_document(blog))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a post from the index.
    pub async fn remove_blog(&self, blog_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.blog_id, blog_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for posts. A blank query text yields an empty page.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchPage, AppError> {
        if query.offset > MAX_SEARCH_OFFSET {
            return Err(AppError::Validation(format!(
                "offset must be at most {}",
                MAX_SEARCH_OFFSET
            )));
        }
        if query.text.trim().is_empty() || query.limit == 0 {
            return Ok(SearchPage::default());
        }

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.username, BOOST_USERNAME),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        let mut text_clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(&query.text) {
                text_clauses.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        if text_clauses.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Invalid search query: {}",
                query.text
            )));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, Box::new(BooleanQuery::new(text_clauses)))];

        if let Some(tag) = non_blank(&query.tag) {
            clauses.push((Occur::Must, self.exact_term(self.fields.tag_exact, tag)));
        }
        if let Some(author) = non_blank(&query.author) {
            clauses.push((Occur::Must, self.exact_term(self.fields.author_exact, author)));
        }

        let combined = BooleanQuery::new(clauses);
        let searcher = self.reader.searcher();

        let (top_docs, total) = searcher
            .search(
                &combined,
                &(TopDocs::with_limit(query.limit.saturating_add(query.offset)), Count),
            )
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let blog_id = doc.get_first(self.fields.blog_id)?.as_str()?.to_string();
                Some(SearchResult { blog_id, score })
            })
            .collect();

        Ok(SearchPage { results, total })
    }

    fn exact_term(&self, field: Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, &value.trim().to_lowercase()),
            IndexRecordOption::Basic,
        ))
    }

    fn create_document(&self, blog: &Blog) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.blog_id, &blog.id);
        doc.add_text(self.fields.title, &blog.title);
        doc.add_text(self.fields.tags, blog.tags.join(" "));
        doc.add_text(self.fields.username, &blog.username);
        doc.add_text(self.fields.description, &blog.description);
        for tag in &blog.tags {
            doc.add_text(self.fields.tag_exact, tag.trim().to_lowercase());
        }
        doc.add_text(self.fields.author_exact, blog.username.trim().to_lowercase());
        doc
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
