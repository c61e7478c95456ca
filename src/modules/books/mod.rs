pub mod forms;
pub mod models;
pub mod repo;
pub mod routes;
pub mod views;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{InitCtx, Migration, Module};

use repo::SqliteBookRepository;

/// Where the module is mounted; redirects after a mutation land here.
pub const BOOKS_PATH: &str = "/books";

/// Tables for books and their reviews. Reviews go with their book both
/// through the repository's delete and through the foreign key.
pub const BOOKS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    title            TEXT    NOT NULL CHECK (length(title) BETWEEN 1 AND 255),
    author           TEXT    NOT NULL CHECK (length(author) BETWEEN 1 AND 255),
    publication_date TEXT    NOT NULL,
    genre            TEXT    NOT NULL CHECK (length(genre) BETWEEN 1 AND 100)
);

CREATE TABLE IF NOT EXISTS reviews (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id       INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
    reviewer_name TEXT    NOT NULL CHECK (length(reviewer_name) BETWEEN 1 AND 255),
    rating        INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    review_text   TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS reviews_book_id_idx ON reviews (book_id);
"#;

/// Library catalog: books, their reviews, and the pages to manage them
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        let repo = Arc::new(SqliteBookRepository::new(ctx.db.clone()));
        routes::router(repo)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let html = |description: &str| {
            json!({
                "description": description,
                "content": { "text/html": { "schema": { "type": "string" } } }
            })
        };
        let redirect = json!({
            "description": "Redirect to the book listing",
            "headers": { "Location": { "schema": { "type": "string" } } }
        });
        let not_found = json!({
            "description": "Book not found",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let book_form = json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "maxLength": 255 },
                "author": { "type": "string", "maxLength": 255 },
                "publication_date": { "type": "string", "format": "date" },
                "genre": { "type": "string", "maxLength": 100 }
            },
            "required": ["title", "author", "publication_date", "genre"]
        });
        let add_form = json!({
            "allOf": [
                { "$ref": "#/components/schemas/BookForm" },
                {
                    "type": "object",
                    "properties": {
                        "reviewer_name": { "type": "string", "maxLength": 255 },
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "review_text": { "type": "string" }
                    },
                    "required": ["reviewer_name", "rating", "review_text"]
                }
            ]
        });
        let form_body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/x-www-form-urlencoded": {
                        "schema": { "$ref": format!("#/components/schemas/{}", schema) }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "genre",
                                "in": "query",
                                "description": "Case-insensitive genre substring",
                                "schema": { "type": "string" }
                            },
                            {
                                "name": "rating",
                                "in": "query",
                                "description": "Rating of at least one review",
                                "schema": { "type": "integer" }
                            }
                        ],
                        "responses": { "200": html("Book listing") }
                    }
                },
                "/add": {
                    "get": {
                        "summary": "Add book page",
                        "tags": ["Books"],
                        "responses": { "200": html("Empty book and review forms") }
                    },
                    "post": {
                        "summary": "Add a book with its first review",
                        "tags": ["Books"],
                        "requestBody": form_body("AddBookForm"),
                        "responses": {
                            "200": html("Forms with validation errors"),
                            "302": redirect.clone()
                        }
                    }
                },
                "/{id}/edit": {
                    "get": {
                        "summary": "Edit book page",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": html("Pre-populated book form"),
                            "404": not_found.clone()
                        }
                    },
                    "post": {
                        "summary": "Update a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": form_body("BookForm"),
                        "responses": {
                            "200": html("Form with validation errors"),
                            "302": redirect.clone(),
                            "404": not_found.clone()
                        }
                    }
                },
                "/{id}/delete": {
                    "get": {
                        "summary": "Delete a book and its reviews",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": { "302": redirect.clone(), "404": not_found.clone() }
                    },
                    "post": {
                        "summary": "Delete a book and its reviews",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": { "302": redirect, "404": not_found }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookForm": book_form,
                    "AddBookForm": add_form
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: BOOKS_SCHEMA,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
