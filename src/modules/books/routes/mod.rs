//! HTTP handlers for the catalog pages.
//!
//! Successful mutations answer with a 302 back to the listing. Invalid
//! forms, including bodies that cannot be read as a form, are re-rendered
//! with a 200 and their field errors; unknown ids surface as the standard
//! 404 error body.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Path, Query, State,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use shelf_http::{redirect, AppError};

use super::forms::{AddBookForm, AddBookValidation, BookForm, FieldErrors, ReviewForm};
use super::models::{BookFilter, BookId};
use super::repo::SharedBookRepository;
use super::views::{self, ListFilterValues};
use super::BOOKS_PATH;

#[derive(Clone)]
pub struct BooksState {
    repo: SharedBookRepository,
}

/// Routes relative to the module mount point.
pub fn router(repo: SharedBookRepository) -> Router {
    Router::new()
        .route("/", get(list_books))
        .route("/add", get(add_book_page).post(add_book))
        .route("/{id}/edit", get(edit_book_page).post(edit_book))
        .route("/{id}/delete", get(delete_book).post(delete_book))
        .with_state(BooksState { repo })
}

/// Raw listing query. Values stay strings so malformed input can be
/// ignored instead of rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub genre: Option<String>,
    pub rating: Option<String>,
}

async fn list_books(
    State(state): State<BooksState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Html<String>, AppError> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "ignoring unreadable listing query");
            ListQuery::default()
        }
    };

    let filter = BookFilter::from_query(query.genre.as_deref(), query.rating.as_deref());
    let books = state.repo.list(&filter).await?;

    tracing::debug!(
        genre = ?filter.genre,
        rating = ?filter.rating,
        count = books.len(),
        "listed books"
    );

    let values = ListFilterValues {
        genre: query.genre.as_deref().unwrap_or_default(),
        rating: query.rating.as_deref().unwrap_or_default(),
    };
    Ok(Html(views::book_list(&books, &values)))
}

async fn add_book_page() -> Html<String> {
    Html(views::add_book(
        &BookForm::default(),
        &FieldErrors::new(),
        &ReviewForm::default(),
        &FieldErrors::new(),
    ))
}

async fn add_book(
    State(state): State<BooksState>,
    form: Result<Form<AddBookForm>, FormRejection>,
) -> Result<Response, AppError> {
    let form = submitted_or_empty(form);

    match form.validate() {
        AddBookValidation::Valid(book, review) => {
            state.repo.create_with_review(&book, &review).await?;
            Ok(redirect::found(BOOKS_PATH))
        }
        AddBookValidation::Invalid {
            book_errors,
            review_errors,
        } => {
            tracing::debug!(
                book_fields = ?book_errors.fields().collect::<Vec<_>>(),
                review_fields = ?review_errors.fields().collect::<Vec<_>>(),
                "add book form rejected"
            );
            let page = views::add_book(&form.book, &book_errors, &form.review, &review_errors);
            Ok(Html(page).into_response())
        }
    }
}

async fn edit_book_page(
    State(state): State<BooksState>,
    Path(raw_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_book_id(&raw_id)?;
    let book = state.repo.get(id).await?;

    Ok(Html(views::edit_book(
        id,
        &BookForm::from_book(&book),
        &FieldErrors::new(),
    )))
}

async fn edit_book(
    State(state): State<BooksState>,
    Path(raw_id): Path<String>,
    form: Result<Form<BookForm>, FormRejection>,
) -> Result<Response, AppError> {
    let id = parse_book_id(&raw_id)?;
    // Unknown ids are a 404 even when the submitted form is invalid
    state.repo.get(id).await?;

    let form = submitted_or_empty(form);

    match form.validate() {
        Ok(book) => {
            state.repo.update(id, &book).await?;
            Ok(redirect::found(BOOKS_PATH))
        }
        Err(errors) => {
            tracing::debug!(
                book_id = id,
                fields = ?errors.fields().collect::<Vec<_>>(),
                "edit book form rejected"
            );
            Ok(Html(views::edit_book(id, &form, &errors)).into_response())
        }
    }
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_book_id(&raw_id)?;
    state.repo.delete(id).await?;
    Ok(redirect::found(BOOKS_PATH))
}

/// An unreadable body counts as an empty submission, so the page comes
/// back with "required" errors instead of an error response.
fn submitted_or_empty<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "treating unreadable form body as empty");
            T::default()
        }
    }
}

/// Ids that are not integers can never resolve, so they are a 404 too.
fn parse_book_id(raw: &str) -> Result<BookId, AppError> {
    raw.parse::<BookId>()
        .map_err(|_| AppError::not_found("book", raw))
}
