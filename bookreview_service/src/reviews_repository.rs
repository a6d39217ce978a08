use crate::api::{BookId, Review, ReviewDraft, ReviewId, ReviewPatch, UserId};
use crate::pagination::PageWindow;

#[derive(thiserror::Error, Debug)]
pub enum ReviewsRepositoryError {
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    #[error("Review {0} not found")]
    NotFound(ReviewId),

    #[error("Book {0} already reviewed by user {1}")]
    AlreadyReviewed(BookId, UserId),

    #[error("Review {0} belongs to a different user")]
    NotOwner(ReviewId),

    #[error("Failed to deserialize review: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Database failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// One window of a book's reviews plus the total number of reviews.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub total: i64,
}

#[async_trait::async_trait]
pub trait ReviewsRepository: Send + Sync {
    /// Stores a review of `book_id` by `user_id`, at most one per pair
    async fn add_review(
        &self,
        book_id: BookId,
        user_id: UserId,
        draft: ReviewDraft,
    ) -> Result<Review, ReviewsRepositoryError>;
    /// Lists reviews of a book joined with reviewer usernames, newest first, restricted to `window`
    async fn list_reviews(
        &self,
        book_id: BookId,
        window: PageWindow,
    ) -> Result<ReviewPage, ReviewsRepositoryError>;
    /// Average rating over all reviews of the book, 0 when there are none
    async fn average_rating(&self, book_id: BookId) -> Result<f64, ReviewsRepositoryError>;
    /// Applies the present patch fields to the caller's own review
    async fn update_review(
        &self,
        review_id: ReviewId,
        user_id: UserId,
        patch: ReviewPatch,
    ) -> Result<Review, ReviewsRepositoryError>;
    /// Removes the caller's own review
    async fn delete_review(
        &self,
        review_id: ReviewId,
        user_id: UserId,
    ) -> Result<(), ReviewsRepositoryError>;
}
