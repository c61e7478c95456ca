//! Form input for the add and edit pages.
//!
//! Raw forms keep exactly what the user typed so an invalid submission can
//! be shown back unchanged. `validate` checks every field and reports all
//! problems at once.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use super::models::{Book, NewBook, NewReview, Rating};

const TITLE_MAX: usize = 255;
const AUTHOR_MAX: usize = 255;
const GENRE_MAX: usize = 100;
const REVIEWER_MAX: usize = 255;

/// Accepted `publication_date` layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const REQUIRED: &str = "This field is required.";

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Messages for `field`, empty when it validated.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub publication_date: String,
    pub genre: String,
}

impl BookForm {
    /// Pre-populate the edit form from a stored book.
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            publication_date: book.publication_date.format("%Y-%m-%d").to_string(),
            genre: book.genre.clone(),
        }
    }

    pub fn validate(&self) -> Result<NewBook, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required_text(&mut errors, "title", &self.title, Some(TITLE_MAX));
        let author = required_text(&mut errors, "author", &self.author, Some(AUTHOR_MAX));
        let publication_date = parse_date(&mut errors, "publication_date", &self.publication_date);
        let genre = required_text(&mut errors, "genre", &self.genre, Some(GENRE_MAX));

        match (title, author, publication_date, genre) {
            (Some(title), Some(author), Some(publication_date), Some(genre))
                if errors.is_empty() =>
            {
                Ok(NewBook {
                    title,
                    author,
                    publication_date,
                    genre,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub reviewer_name: String,
    pub rating: String,
    pub review_text: String,
}

impl ReviewForm {
    pub fn validate(&self) -> Result<NewReview, FieldErrors> {
        let mut errors = FieldErrors::new();

        let reviewer_name = required_text(
            &mut errors,
            "reviewer_name",
            &self.reviewer_name,
            Some(REVIEWER_MAX),
        );
        let rating = parse_rating(&mut errors, "rating", &self.rating);
        let review_text = required_text(&mut errors, "review_text", &self.review_text, None);

        match (reviewer_name, rating, review_text) {
            (Some(reviewer_name), Some(rating), Some(review_text)) if errors.is_empty() => {
                Ok(NewReview {
                    reviewer_name,
                    rating,
                    review_text,
                })
            }
            _ => Err(errors),
        }
    }
}

/// The add page posts book and review fields in one body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBookForm {
    #[serde(flatten)]
    pub book: BookForm,
    #[serde(flatten)]
    pub review: ReviewForm,
}

/// Outcome of validating both halves of the add page together.
pub enum AddBookValidation {
    Valid(NewBook, NewReview),
    Invalid {
        book_errors: FieldErrors,
        review_errors: FieldErrors,
    },
}

impl AddBookForm {
    /// Both forms are always validated so the page can show every error.
    pub fn validate(&self) -> AddBookValidation {
        match (self.book.validate(), self.review.validate()) {
            (Ok(book), Ok(review)) => AddBookValidation::Valid(book, review),
            (book, review) => AddBookValidation::Invalid {
                book_errors: book.err().unwrap_or_default(),
                review_errors: review.err().unwrap_or_default(),
            },
        }
    }
}

fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    raw: &str,
    max_chars: Option<usize>,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }

    if let Some(max) = max_chars {
        let len = value.chars().count();
        if len > max {
            errors.add(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, len
                ),
            );
            return None;
        }
    }

    Some(value.to_string())
}

fn parse_date(errors: &mut FieldErrors, field: &'static str, raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok());
    if parsed.is_none() {
        errors.add(field, "Enter a valid date.");
    }
    parsed
}

fn parse_rating(errors: &mut FieldErrors, field: &'static str, raw: &str) -> Option<Rating> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }

    let rating = value
        .parse::<i64>()
        .ok()
        .and_then(|n| Rating::try_from(n).ok());
    if rating.is_none() {
        errors.add(
            field,
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                value
            ),
        );
    }
    rating
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> BookForm {
        BookForm {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            publication_date: "1965-06-01".to_string(),
            genre: "Sci-Fi".to_string(),
        }
    }

    fn alice(rating: &str) -> ReviewForm {
        ReviewForm {
            reviewer_name: "Alice".to_string(),
            rating: rating.to_string(),
            review_text: "Great".to_string(),
        }
    }

    #[test]
    fn valid_book_is_trimmed() {
        let mut form = dune();
        form.title = "  Dune  ".to_string();

        let book = form.validate().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(
            book.publication_date,
            NaiveDate::from_ymd_opt(1965, 6, 1).unwrap()
        );
    }

    #[test]
    fn every_invalid_field_is_reported() {
        let form = BookForm {
            title: " ".to_string(),
            author: "a".repeat(256),
            publication_date: "June 1965".to_string(),
            genre: String::new(),
        };

        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["author", "genre", "publication_date", "title"]
        );
        assert_eq!(errors.get("title"), [REQUIRED.to_string()]);
        assert_eq!(
            errors.get("author"),
            ["Ensure this value has at most 255 characters (it has 256).".to_string()]
        );
        assert_eq!(errors.get("publication_date"), ["Enter a valid date.".to_string()]);
    }

    #[test]
    fn genre_limit_counts_characters() {
        let mut form = dune();
        form.genre = "é".repeat(100);
        assert!(form.validate().is_ok());

        form.genre.push('é');
        assert!(form.validate().unwrap_err().get("genre")[0].contains("at most 100"));
    }

    #[test]
    fn alternate_date_layouts_accepted() {
        let mut form = dune();
        form.publication_date = "06/01/1965".to_string();
        assert_eq!(
            form.validate().unwrap().publication_date,
            NaiveDate::from_ymd_opt(1965, 6, 1).unwrap()
        );
    }

    #[test]
    fn rating_must_be_one_to_five() {
        for bad in ["0", "6", "-1", "3.5", "five"] {
            let errors = alice(bad).validate().unwrap_err();
            assert_eq!(
                errors.get("rating"),
                [format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    bad
                )]
            );
        }

        for good in ["1", "5"] {
            assert!(alice(good).validate().is_ok());
        }
    }

    #[test]
    fn add_form_collects_errors_from_both_halves() {
        let mut book = dune();
        book.title.clear();
        let form = AddBookForm {
            book,
            review: alice("6"),
        };

        match form.validate() {
            AddBookValidation::Invalid {
                book_errors,
                review_errors,
            } => {
                assert_eq!(book_errors.fields().collect::<Vec<_>>(), vec!["title"]);
                assert_eq!(review_errors.fields().collect::<Vec<_>>(), vec!["rating"]);
            }
            AddBookValidation::Valid(..) => panic!("expected invalid add form"),
        }
    }

    #[test]
    fn add_form_with_valid_book_but_bad_review_is_invalid() {
        let form = AddBookForm {
            book: dune(),
            review: alice("0"),
        };

        match form.validate() {
            AddBookValidation::Invalid {
                book_errors,
                review_errors,
            } => {
                assert!(book_errors.is_empty());
                assert!(!review_errors.is_empty());
            }
            AddBookValidation::Valid(..) => panic!("expected invalid add form"),
        }
    }

    #[test]
    fn book_form_round_trips_stored_book() {
        let stored = Book {
            id: 7,
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            publication_date: NaiveDate::from_ymd_opt(1965, 6, 1).unwrap(),
            genre: "Sci-Fi".to_string(),
        };

        assert_eq!(BookForm::from_book(&stored), dune());
    }
}
