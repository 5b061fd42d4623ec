//! HTTP handlers for the book catalog.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_http::error::{AppError, MessageBody};

use super::models::{parse_id, Book, CreateBookRequest, PriceRangeQuery, UpdateBookRequest};
use super::repository::BookRepository;

pub type SharedRepository = Arc<dyn BookRepository>;

const NOT_FOUND: &str = "Book not found";
const DELETED: &str = "Book deleted successfully";

pub fn router(repository: SharedRepository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .with_state(repository)
}

async fn create_book(
    State(repository): State<SharedRepository>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(payload) = payload?;
    let new_book = payload.validate()?;

    let book = repository.insert(new_book).await?;
    tracing::info!(book_id = book.id, price = book.price, "book created");

    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(repository): State<SharedRepository>,
    query: Result<Query<PriceRangeQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    let Some(range) = query.validate()? else {
        tracing::debug!("minprice exceeds every storable price");
        return Ok(Json(Vec::new()));
    };

    let books = repository.list_by_price(&range).await?;
    tracing::debug!(min = range.min, max = ?range.max, count = books.len(), "books listed");

    Ok(Json(books))
}

async fn get_book(
    State(repository): State<SharedRepository>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = parse_id(&id)?.ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    repository
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

async fn delete_book(
    State(repository): State<SharedRepository>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    let id = parse_id(&id)?.ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if repository.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found(NOT_FOUND));
    }
    // A concurrent delete may win between the lookup and here.
    if !repository.delete(id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    tracing::info!(book_id = id, "book deleted");

    Ok(Json(MessageBody::new(DELETED)))
}

async fn update_book(
    State(repository): State<SharedRepository>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let changes = payload.validate()?;
    let id = id.ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let mut book = repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if changes.title.as_deref() == Some("") {
        // Creation refuses empty titles; updates have always let them through.
        tracing::warn!(book_id = id, "book title updated to an empty string");
    }
    changes.apply(&mut book);

    let book = repository
        .update(&book)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    tracing::info!(book_id = book.id, "book updated");

    Ok(Json(book))
}
