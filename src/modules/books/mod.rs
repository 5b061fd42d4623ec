pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use bookstore_kernel::{InitCtx, Migration, Module};
use sqlx::SqlitePool;

use repository::SqliteBookRepository;
use routes::SharedRepository;

/// The book catalog: CRUD over the `books` table, mounted at the root.
pub struct BooksModule {
    repository: SharedRepository,
}

impl BooksModule {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn base_path(&self) -> String {
        "/".to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(ctx.db)
            .await
            .context("books table is not readable")?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = count,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    title      TEXT    NOT NULL,
                    price      INTEGER NOT NULL CHECK (price >= 0),
                    created_at TEXT    NOT NULL,
                    updated_at TEXT    NOT NULL
                );
                "#,
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

/// Create the books module backed by `pool`
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(SqliteBookRepository::new(pool))))
}

fn message_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/MessageResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    });

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books within a price range",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "minprice",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "integer", "minimum": 0 }
                        },
                        {
                            "name": "maxprice",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "integer", "minimum": 0 }
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "Books with minprice <= price <= maxprice",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "400": message_response("Missing or invalid price bounds"),
                        "500": message_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Created book"),
                        "400": message_response("Missing or invalid title or price"),
                        "500": message_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "400": message_response("Invalid ID"),
                        "404": message_response("Book not found"),
                        "500": message_response("Internal server error")
                    }
                },
                "patch": {
                    "summary": "Update a book's title and/or price",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": message_response("Invalid ID, no fields, or invalid price"),
                        "404": message_response("Book not found"),
                        "500": message_response("Internal server error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": message_response("Book deleted successfully"),
                        "400": message_response("Invalid ID"),
                        "404": message_response("Book not found"),
                        "500": message_response("Internal server error")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "price": { "type": "integer", "minimum": 0 },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "price", "createdAt", "updatedAt"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1 },
                        "price": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["title", "price"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "price": { "type": "integer", "minimum": 0 }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = bookstore_db::connect(&bookstore_kernel::settings::DatabaseSettings::in_memory())
        .await
        .unwrap();
    let migrations: Vec<(String, Migration)> = create_module(pool.clone())
        .migrations()
        .into_iter()
        .map(|migration| ("books".to_string(), migration))
        .collect();
    bookstore_db::apply_migrations(&pool, &migrations)
        .await
        .unwrap();
    pool
}
