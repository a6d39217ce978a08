use crate::api::{Book, BookDetails, BookId, UserId};
use crate::pagination::PageWindow;

#[derive(thiserror::Error, Debug)]
pub enum BooksRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Database failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Case insensitive substring filters for book listings.
///
/// Both filters are optional and combined with AND when both are set.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BookFilter {
    pub author: Option<String>,
    pub genre: Option<String>,
}

/// One window of a book listing plus the total number of matching records.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
}

#[async_trait::async_trait]
pub trait BooksRepository: Send + Sync {
    /// Stores a new book for `created_by`, returns it with an assigned id and timestamps
    async fn add_book(
        &self,
        details: BookDetails,
        created_by: UserId,
    ) -> Result<Book, BooksRepositoryError>;
    /// Lists books matching `filter`, newest first, restricted to `window`
    async fn list_books(
        &self,
        filter: &BookFilter,
        window: PageWindow,
    ) -> Result<BookPage, BooksRepositoryError>;
    /// Lists books whose title or author contains `query`, newest first, restricted to `window`
    async fn search_books(
        &self,
        query: &str,
        window: PageWindow,
    ) -> Result<BookPage, BooksRepositoryError>;
    /// Retrieves a single book
    async fn get_book(&self, book_id: BookId) -> Result<Book, BooksRepositoryError>;
}
