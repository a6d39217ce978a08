//! Validation of user supplied input, applied before anything reaches a store.

use crate::api::BookDetails;

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("rating must be between {} and {}", RATING_MIN, RATING_MAX)]
    RatingOutOfRange(i32),
}

/// Checks that every required book field is non blank.
///
/// Title, author, genre and isbn are returned trimmed. The description only
/// has to contain a non whitespace character and is kept verbatim.
pub fn validate_book_details(details: BookDetails) -> Result<BookDetails, ValidationError> {
    let title = details.title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    let author = details.author.trim();
    if author.is_empty() {
        return Err(ValidationError::MissingField("author"));
    }
    let genre = details.genre.trim();
    if genre.is_empty() {
        return Err(ValidationError::MissingField("genre"));
    }
    if details.description.trim().is_empty() {
        return Err(ValidationError::MissingField("description"));
    }

    Ok(BookDetails {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        description: details.description,
        published_year: details.published_year,
        isbn: details.isbn.map(|isbn| isbn.trim().to_string()),
    })
}

/// Rejects ratings outside of the 1 to 5 range.
pub fn validate_rating(rating: i32) -> Result<(), ValidationError> {
    if (RATING_MIN..=RATING_MAX).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::RatingOutOfRange(rating))
    }
}
