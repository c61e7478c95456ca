//! Book repository
//!
//! - list: one query for matching books, one query for their reviews
//!   selected through the same filter (no N+1, no per-id binds); the
//!   rating filter is an `EXISTS` so each book appears once
//! - create_with_review and delete run in a single transaction

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shelf_http::AppError;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::models::{Book, BookFilter, BookId, BookWithReviews, NewBook, NewReview, Review};

const BOOK_COLUMNS: &str = "id, title, author, publication_date, genre";
const REVIEW_COLUMNS: &str = "id, book_id, reviewer_name, rating, review_text";

/// Repository error type
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}

impl RepoError {
    fn book_not_found(id: BookId) -> Self {
        Self::NotFound {
            resource: "book",
            id: id.to_string(),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { resource, id } => AppError::not_found(resource, id),
            RepoError::Sqlx(e) => AppError::Internal(e.into()),
        }
    }
}

/// Persistence operations the book handlers depend on.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Books matching `filter`, ordered by id, each with its reviews.
    async fn list(&self, filter: &BookFilter) -> Result<Vec<BookWithReviews>, RepoError>;

    async fn get(&self, id: BookId) -> Result<Book, RepoError>;

    /// Insert a book and its first review atomically.
    async fn create_with_review(
        &self,
        book: &NewBook,
        review: &NewReview,
    ) -> Result<(Book, Review), RepoError>;

    /// Replace every field of an existing book.
    async fn update(&self, id: BookId, book: &NewBook) -> Result<Book, RepoError>;

    /// Delete a book and its reviews, returning how many reviews went with it.
    async fn delete(&self, id: BookId) -> Result<u64, RepoError>;
}

pub type SharedBookRepository = Arc<dyn BookRepository>;

/// SQLite-backed book repository
#[derive(Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Reviews of every book matching `filter`, ordered by id.
    async fn reviews_for(&self, filter: &BookFilter) -> Result<Vec<Review>, RepoError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM reviews WHERE book_id IN (SELECT b.id FROM books b WHERE 1 = 1",
            REVIEW_COLUMNS
        ));
        push_book_predicates(&mut query, filter);
        query.push(") ORDER BY id");

        let reviews = query
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }
}

/// Append the `AND ...` clauses selecting books `b` that match `filter`.
fn push_book_predicates<'q>(query: &mut QueryBuilder<'q, Sqlite>, filter: &'q BookFilter) {
    if let Some(genre) = &filter.genre {
        // lower() folds ASCII only, matching SQLite's own LIKE
        query
            .push(" AND instr(lower(b.genre), lower(")
            .push_bind(genre.as_str())
            .push(")) > 0");
    }
    if let Some(rating) = filter.rating {
        query
            .push(" AND EXISTS (SELECT 1 FROM reviews r WHERE r.book_id = b.id AND r.rating = ")
            .push_bind(rating)
            .push(")");
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn list(&self, filter: &BookFilter) -> Result<Vec<BookWithReviews>, RepoError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM books b WHERE 1 = 1", BOOK_COLUMNS));
        push_book_predicates(&mut query, filter);
        query.push(" ORDER BY b.id");

        let books = query.build_query_as::<Book>().fetch_all(&self.pool).await?;

        let mut by_book: HashMap<BookId, Vec<Review>> = HashMap::new();
        for review in self.reviews_for(filter).await? {
            by_book.entry(review.book_id).or_default().push(review);
        }

        Ok(books
            .into_iter()
            .map(|book| {
                let reviews = by_book.remove(&book.id).unwrap_or_default();
                BookWithReviews { book, reviews }
            })
            .collect())
    }

    async fn get(&self, id: BookId) -> Result<Book, RepoError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepoError::book_not_found(id))
    }

    async fn create_with_review(
        &self,
        book: &NewBook,
        review: &NewReview,
    ) -> Result<(Book, Review), RepoError> {
        let mut tx = self.pool.begin().await?;

        let created: Book = sqlx::query_as(&format!(
            "INSERT INTO books (title, author, publication_date, genre) \
             VALUES (?, ?, ?, ?) RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.publication_date)
        .bind(&book.genre)
        .fetch_one(&mut *tx)
        .await?;

        let first_review: Review = sqlx::query_as(&format!(
            "INSERT INTO reviews (book_id, reviewer_name, rating, review_text) \
             VALUES (?, ?, ?, ?) RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(created.id)
        .bind(&review.reviewer_name)
        .bind(i64::from(review.rating))
        .bind(&review.review_text)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            book_id = created.id,
            review_id = first_review.id,
            title = %created.title,
            "book created"
        );
        Ok((created, first_review))
    }

    async fn update(&self, id: BookId, book: &NewBook) -> Result<Book, RepoError> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET title = ?, author = ?, publication_date = ?, genre = ? \
             WHERE id = ? RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.publication_date)
        .bind(&book.genre)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::book_not_found(id))?;

        tracing::info!(book_id = id, title = %updated.title, "book updated");
        Ok(updated)
    }

    async fn delete(&self, id: BookId) -> Result<u64, RepoError> {
        let mut tx = self.pool.begin().await?;

        let reviews = sqlx::query("DELETE FROM reviews WHERE book_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let books = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if books == 0 {
            // Dropping the transaction rolls back the review delete
            return Err(RepoError::book_not_found(id));
        }

        tx.commit().await?;

        tracing::info!(book_id = id, reviews_removed = reviews, "book deleted");
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::Rating;
    use crate::modules::books::BOOKS_SCHEMA;
    use chrono::NaiveDate;

    async fn repo() -> (SqliteBookRepository, SqlitePool) {
        let pool = shelf_db::connect_in_memory().await.unwrap();
        sqlx::raw_sql(BOOKS_SCHEMA).execute(&pool).await.unwrap();
        (SqliteBookRepository::new(pool.clone()), pool)
    }

    fn new_book(title: &str, genre: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Herbert".to_string(),
            publication_date: NaiveDate::from_ymd_opt(1965, 6, 1).unwrap(),
            genre: genre.to_string(),
        }
    }

    fn new_review(reviewer: &str, rating: i64) -> NewReview {
        NewReview {
            reviewer_name: reviewer.to_string(),
            rating: Rating::try_from(rating).unwrap(),
            review_text: "Great".to_string(),
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    /// Attach an extra review directly; the repository only creates the first.
    async fn add_review(pool: &SqlitePool, book_id: BookId, rating: i64) {
        sqlx::query(
            "INSERT INTO reviews (book_id, reviewer_name, rating, review_text) \
             VALUES (?, 'Bob', ?, 'Fine')",
        )
        .bind(book_id)
        .bind(rating)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn create_links_review_to_new_book() {
        let (repo, pool) = repo().await;

        let (book, review) = repo
            .create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();

        assert_eq!(review.book_id, book.id);
        assert_eq!(review.rating.get(), 5);
        assert_eq!(repo.get(book.id).await.unwrap(), book);
        assert_eq!(count(&pool, "books").await, 1);
        assert_eq!(count(&pool, "reviews").await, 1);
    }

    #[tokio::test]
    async fn genre_filter_is_case_insensitive_substring() {
        let (repo, _pool) = repo().await;
        repo.create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();
        repo.create_with_review(&new_book("Emma", "Romance"), &new_review("Carol", 4))
            .await
            .unwrap();

        for needle in ["Sci-Fi", "sci", "FI", "i-f"] {
            let found = repo
                .list(&BookFilter::from_query(Some(needle), None))
                .await
                .unwrap();
            let titles: Vec<_> = found.iter().map(|b| b.book.title.as_str()).collect();
            assert_eq!(titles, vec!["Dune"], "needle {needle}");
        }

        // Whitespace in the needle is part of the substring
        let found = repo
            .list(&BookFilter::from_query(Some("ce "), None))
            .await
            .unwrap();
        assert!(found.is_empty());
        let found = repo
            .list(&BookFilter::from_query(Some("ance"), None))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn listing_large_catalog_loads_every_review() {
        let (repo, pool) = repo().await;
        // More books than SQLite allows bound variables in one statement
        sqlx::query(
            "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 33000) \
             INSERT INTO books (title, author, publication_date, genre) \
             SELECT 'Book ' || i, 'Anon', '2000-01-01', 'Misc' FROM n",
        )
        .execute(&pool)
        .await
        .unwrap();
        add_review(&pool, 1, 4).await;
        add_review(&pool, 33000, 2).await;

        let all = repo.list(&BookFilter::default()).await.unwrap();
        assert_eq!(all.len(), 33000);
        assert_eq!(all[0].reviews.len(), 1);
        assert_eq!(all[32999].reviews[0].rating.get(), 2);
        assert!(all[1].reviews.is_empty());

        let rated = repo
            .list(&BookFilter::from_query(Some("misc"), Some("2")))
            .await
            .unwrap();
        assert_eq!(rated.len(), 1);
        assert_eq!(rated[0].book.id, 33000);
    }

    #[tokio::test]
    async fn rating_filter_deduplicates_books() {
        let (repo, pool) = repo().await;
        let (dune, _) = repo
            .create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();
        add_review(&pool, dune.id, 5).await;
        add_review(&pool, dune.id, 2).await;

        let found = repo
            .list(&BookFilter::from_query(None, Some("5")))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reviews.len(), 3);
    }

    #[tokio::test]
    async fn filters_compose_with_and() {
        let (repo, _pool) = repo().await;
        repo.create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();
        repo.create_with_review(&new_book("Solaris", "Sci-Fi"), &new_review("Dan", 3))
            .await
            .unwrap();
        repo.create_with_review(&new_book("Emma", "Romance"), &new_review("Carol", 5))
            .await
            .unwrap();

        let found = repo
            .list(&BookFilter::from_query(Some("sci"), Some("5")))
            .await
            .unwrap();
        let titles: Vec<_> = found.iter().map(|b| b.book.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune"]);

        let all = repo.list(&BookFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_replaces_fields_without_new_rows() {
        let (repo, pool) = repo().await;
        let (book, _) = repo
            .create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();

        let updated = repo
            .update(book.id, &new_book("Dune Messiah", "Science Fiction"))
            .await
            .unwrap();

        assert_eq!(updated.id, book.id);
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(repo.get(book.id).await.unwrap().genre, "Science Fiction");
        assert_eq!(count(&pool, "books").await, 1);
        assert_eq!(count(&pool, "reviews").await, 1);
    }

    #[tokio::test]
    async fn delete_cascades_and_then_reports_not_found() {
        let (repo, pool) = repo().await;
        let (dune, _) = repo
            .create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();
        add_review(&pool, dune.id, 3).await;
        let (emma, _) = repo
            .create_with_review(&new_book("Emma", "Romance"), &new_review("Carol", 4))
            .await
            .unwrap();

        assert_eq!(repo.delete(dune.id).await.unwrap(), 2);

        assert_eq!(count(&pool, "books").await, 1);
        assert_eq!(count(&pool, "reviews").await, 1);
        assert!(repo.get(emma.id).await.is_ok());
        assert!(matches!(
            repo.delete(dune.id).await,
            Err(RepoError::NotFound { resource: "book", .. })
        ));
        assert!(matches!(
            repo.update(dune.id, &new_book("Dune", "Sci-Fi")).await,
            Err(RepoError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn schema_rejects_out_of_range_rating() {
        let (repo, pool) = repo().await;
        let (book, _) = repo
            .create_with_review(&new_book("Dune", "Sci-Fi"), &new_review("Alice", 5))
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO reviews (book_id, reviewer_name, rating, review_text) \
             VALUES (?, 'Eve', 6, 'Bad')",
        )
        .bind(book.id)
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: AppError = RepoError::book_not_found(9).into();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
