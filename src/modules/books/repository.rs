use anyhow::Context;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;

use super::models::{Book, NewBook, PriceRange};

/// Storage operations the HTTP handlers rely on.
///
/// Each call is a single statement, so it is atomic on its own.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: NewBook) -> anyhow::Result<Book>;

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Book>>;

    /// Books whose price falls in `range`, in insertion order.
    async fn list_by_price(&self, range: &PriceRange) -> anyhow::Result<Vec<Book>>;

    /// Persist `book`'s title and price and bump `updated_at`.
    /// Returns `None` when the row no longer exists.
    async fn update(&self, book: &Book) -> anyhow::Result<Option<Book>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn insert(&self, book: NewBook) -> anyhow::Result<Book> {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, price, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, title, price, created_at, updated_at
            "#,
        )
        .bind(&book.title)
        .bind(book.price)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert book")
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Book>> {
        sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, price, created_at, updated_at
            FROM books
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load book {}", id))
    }

    async fn list_by_price(&self, range: &PriceRange) -> anyhow::Result<Vec<Book>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, title, price, created_at, updated_at FROM books WHERE price >= ",
        );
        query.push_bind(range.min);
        if let Some(max) = range.max {
            query.push(" AND price <= ").push_bind(max);
        }
        query.push(" ORDER BY id");

        query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to list books in {:?}", range))
    }

    async fn update(&self, book: &Book) -> anyhow::Result<Option<Book>> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = ?, price = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, title, price, created_at, updated_at
            "#,
        )
        .bind(&book.title)
        .bind(book.price)
        .bind(OffsetDateTime::now_utc())
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update book {}", book.id))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete book {}", id))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::test_pool;

    fn new_book(title: &str, price: i64) -> NewBook {
        NewBook {
            title: title.to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let repo = SqliteBookRepository::new(test_pool().await);

        let book = repo.insert(new_book("Dune", 20)).await.unwrap();
        assert_eq!(book.id, 1);
        assert_eq!(book.title, "Dune");
        assert_eq!(book.price, 20);
        assert_eq!(book.created_at, book.updated_at);

        let found = repo.find_by_id(book.id).await.unwrap();
        assert_eq!(found, Some(book));
        assert!(repo.find_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_inclusively_in_insertion_order() {
        let repo = SqliteBookRepository::new(test_pool().await);
        for (title, price) in [("c", 30), ("a", 10), ("d", 40), ("b", 9), ("e", 31)] {
            repo.insert(new_book(title, price)).await.unwrap();
        }

        let titles = |books: Vec<Book>| books.into_iter().map(|b| b.title).collect::<Vec<_>>();

        let bounded = repo
            .list_by_price(&PriceRange {
                min: 10,
                max: Some(30),
            })
            .await
            .unwrap();
        assert_eq!(titles(bounded), vec!["c", "a"]);

        let open = repo
            .list_by_price(&PriceRange { min: 30, max: None })
            .await
            .unwrap();
        assert_eq!(titles(open), vec!["c", "d", "e"]);

        let empty = repo
            .list_by_price(&PriceRange {
                min: 100,
                max: None,
            })
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn update_persists_fields() {
        let repo = SqliteBookRepository::new(test_pool().await);
        let mut book = repo.insert(new_book("Dune", 20)).await.unwrap();

        book.price = 25;
        let updated = repo.update(&book).await.unwrap().unwrap();
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.price, 25);
        assert_eq!(updated.created_at, book.created_at);
        assert!(updated.updated_at >= book.updated_at);

        let missing = Book { id: 42, ..book };
        assert!(repo.update(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = SqliteBookRepository::new(test_pool().await);
        let first = repo.insert(new_book("Dune", 20)).await.unwrap();

        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());

        let second = repo.insert(new_book("Emma", 5)).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn negative_price_is_refused_by_storage() {
        let repo = SqliteBookRepository::new(test_pool().await);
        assert!(repo.insert(new_book("Dune", -1)).await.is_err());
    }
}
