use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type BookId = i64;
pub type ReviewId = i64;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publication_date: NaiveDate,
    pub genre: String,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A reader's rating of one book. Owned by its book and removed with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub reviewer_name: String,
    #[sqlx(try_from = "i64")]
    pub rating: Rating,
    pub review_text: String,
}

/// A book with all of its reviews, as shown in the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookWithReviews {
    pub book: Book,
    pub reviews: Vec<Review>,
}

/// Validated book fields, used for both creation and edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publication_date: NaiveDate,
    pub genre: String,
}

/// Validated fields of the review that accompanies a new book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub reviewer_name: String,
    pub rating: Rating,
    pub review_text: String,
}

/// Star rating, always within `Rating::MIN..=Rating::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating {0} is outside 1..=5")]
pub struct InvalidRating(pub i64);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every valid rating, lowest first.
    pub fn all() -> impl Iterator<Item = Rating> {
        (Self::MIN..=Self::MAX).map(Rating)
    }
}

impl TryFrom<i64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(InvalidRating(value))
        }
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listing filters. `None` means the filter is not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Case-insensitive substring of the genre
    pub genre: Option<String>,
    /// Exact rating of at least one review; out-of-range values match nothing
    pub rating: Option<i64>,
}

impl BookFilter {
    /// Build a filter from raw query values. Blank values and a rating
    /// that is not an integer leave that filter off. A non-blank genre is
    /// matched as typed, surrounding whitespace included.
    pub fn from_query(genre: Option<&str>, rating: Option<&str>) -> Self {
        let genre = genre
            .filter(|g| !g.trim().is_empty())
            .map(str::to_string);
        let rating = rating.and_then(|r| r.trim().parse::<i64>().ok());
        Self { genre, rating }
    }

    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.rating.is_none()
    }
}
