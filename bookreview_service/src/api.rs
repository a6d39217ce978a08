use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = i32;
pub type ReviewId = i32;
pub type UserId = i32;

/// Free form fields of a book, provided by the user that adds it.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

/// A stored book together with its server assigned id and timestamps.
///
/// Timestamps are seconds since the unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Book {
    pub fn from_details(
        id: BookId,
        details: BookDetails,
        created_by: UserId,
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            id,
            title: details.title,
            author: details.author,
            genre: details.genre,
            description: details.description,
            published_year: details.published_year,
            isbn: details.isbn,
            created_by,
            created_at,
            updated_at,
        }
    }
}

/// A review of a single book, joined with the username of its author.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub book: BookId,
    pub user: UserId,
    pub username: String,
    pub rating: i32,
    pub text: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Body of the add review request.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ReviewDraft {
    pub rating: i32,
    pub text: String,
}

/// Body of the update review request, absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ReviewPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One page of a book listing, returned by the list and search endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct BookListPage {
    pub books: Vec<Book>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_books: i64,
}

/// A single book with one page of its reviews and the current average rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetailPage {
    pub book: Book,
    pub reviews: Vec<Review>,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Confirmation body of the delete review endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ApiMessage {
    pub message: String,
}

/// Error body, `error` carries the underlying cause for server errors.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pagination part of the query string.
///
/// Values are kept as raw strings so that absent or malformed parameters can
/// fall back to the defaults instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize, Apiv2Schema)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Query string of the list books endpoint.
#[derive(Debug, Clone, Default, Deserialize, Apiv2Schema)]
pub struct ListBooksQuery {
    pub author: Option<String>,
    pub genre: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Query string of the search endpoint.
#[derive(Debug, Clone, Default, Deserialize, Apiv2Schema)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}
