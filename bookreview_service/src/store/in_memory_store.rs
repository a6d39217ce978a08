use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::{Book, BookDetails, BookId, Review, ReviewDraft, ReviewId, ReviewPatch, UserId};
use crate::books_repository::{BookFilter, BookPage, BooksRepository, BooksRepositoryError};
use crate::pagination::PageWindow;
use crate::rating;
use crate::reviews_repository::{ReviewPage, ReviewsRepository, ReviewsRepositoryError};
use crate::store::epoch_seconds;
use crate::users_repository::{UserAccount, UsersRepository, UsersRepositoryError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredReview {
    id: ReviewId,
    book_id: BookId,
    user_id: UserId,
    rating: i32,
    text: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Clone)]
struct StoredUser {
    username: String,
    token: String,
}

/// Process local store, used by development setups and tests.
pub struct InMemoryStore {
    book_sequence_generator: AtomicI32,
    review_sequence_generator: AtomicI32,
    user_sequence_generator: AtomicI32,
    books: parking_lot::RwLock<HashMap<BookId, Book>>,
    reviews: parking_lot::RwLock<HashMap<ReviewId, StoredReview>>,
    users: parking_lot::RwLock<HashMap<UserId, StoredUser>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        // Sequences start at 1 to match the ids a fresh postgres store assigns
        Self {
            book_sequence_generator: AtomicI32::new(1),
            review_sequence_generator: AtomicI32::new(1),
            user_sequence_generator: AtomicI32::new(1),
            books: Default::default(),
            reviews: Default::default(),
            users: Default::default(),
        }
    }
}

impl InMemoryStore {
    fn review_with_username(
        &self,
        stored: &StoredReview,
    ) -> Result<Review, ReviewsRepositoryError> {
        let users = self.users.read();
        let username = users
            .get(&stored.user_id)
            .map(|user| user.username.clone())
            .ok_or_else(|| {
                ReviewsRepositoryError::Other(format!("No account for user {}", stored.user_id))
            })?;
        Ok(Review {
            id: stored.id,
            book: stored.book_id,
            user: stored.user_id,
            username,
            rating: stored.rating,
            text: stored.text.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Applies newest first ordering and the pagination window to matching books.
fn page_of_books<'a>(matching: impl Iterator<Item = &'a Book>, window: PageWindow) -> BookPage {
    let mut matching: Vec<Book> = matching.cloned().collect();
    matching.sort_by_key(|book| (std::cmp::Reverse(book.created_at), std::cmp::Reverse(book.id)));
    let total = matching.len() as i64;
    let books = matching
        .into_iter()
        .skip(window.skip() as usize)
        .take(window.limit as usize)
        .collect();
    BookPage { books, total }
}

#[async_trait::async_trait]
impl BooksRepository for InMemoryStore {
    async fn add_book(
        &self,
        details: BookDetails,
        created_by: UserId,
    ) -> Result<Book, BooksRepositoryError> {
        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        let now = epoch_seconds();
        let book = Book::from_details(id, details, created_by, now, now);
        self.books.write().insert(id, book.clone());
        Ok(book)
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
        window: PageWindow,
    ) -> Result<BookPage, BooksRepositoryError> {
        let books = self.books.read();
        let matching = books.values().filter(|book| {
            filter
                .author
                .as_deref()
                .map_or(true, |author| contains_ci(&book.author, author))
                && filter
                    .genre
                    .as_deref()
                    .map_or(true, |genre| contains_ci(&book.genre, genre))
        });
        Ok(page_of_books(matching, window))
    }

    async fn search_books(
        &self,
        query: &str,
        window: PageWindow,
    ) -> Result<BookPage, BooksRepositoryError> {
        let books = self.books.read();
        let matching = books
            .values()
            .filter(|book| contains_ci(&book.title, query) || contains_ci(&book.author, query));
        Ok(page_of_books(matching, window))
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BooksRepositoryError> {
        self.books
            .read()
            .get(&book_id)
            .cloned()
            .ok_or(BooksRepositoryError::NotFound(book_id))
    }
}

#[async_trait::async_trait]
impl ReviewsRepository for InMemoryStore {
    async fn add_review(
        &self,
        book_id: BookId,
        user_id: UserId,
        draft: ReviewDraft,
    ) -> Result<Review, ReviewsRepositoryError> {
        if !self.books.read().contains_key(&book_id) {
            return Err(ReviewsRepositoryError::BookNotFound(book_id));
        }

        // The duplicate check and the insert happen under one write lock
        let mut reviews = self.reviews.write();
        if reviews
            .values()
            .any(|review| review.book_id == book_id && review.user_id == user_id)
        {
            return Err(ReviewsRepositoryError::AlreadyReviewed(book_id, user_id));
        }

        let id = self.review_sequence_generator.fetch_add(1, Ordering::Relaxed);
        let now = epoch_seconds();
        let stored = StoredReview {
            id,
            book_id,
            user_id,
            rating: draft.rating,
            text: draft.text,
            created_at: now,
            updated_at: now,
        };
        let review = self.review_with_username(&stored)?;
        reviews.insert(id, stored);
        Ok(review)
    }

    async fn list_reviews(
        &self,
        book_id: BookId,
        window: PageWindow,
    ) -> Result<ReviewPage, ReviewsRepositoryError> {
        let reviews = self.reviews.read();
        let mut matching: Vec<&StoredReview> = reviews
            .values()
            .filter(|review| review.book_id == book_id)
            .collect();
        matching.sort_by_key(|review| {
            (
                std::cmp::Reverse(review.created_at),
                std::cmp::Reverse(review.id),
            )
        });
        let total = matching.len() as i64;
        let windowed = matching
            .into_iter()
            .skip(window.skip() as usize)
            .take(window.limit as usize)
            .map(|stored| self.review_with_username(stored))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReviewPage {
            reviews: windowed,
            total,
        })
    }

    async fn average_rating(&self, book_id: BookId) -> Result<f64, ReviewsRepositoryError> {
        let reviews = self.reviews.read();
        let ratings: Vec<i32> = reviews
            .values()
            .filter(|review| review.book_id == book_id)
            .map(|review| review.rating)
            .collect();
        Ok(rating::average(&ratings))
    }

    async fn update_review(
        &self,
        review_id: ReviewId,
        user_id: UserId,
        patch: ReviewPatch,
    ) -> Result<Review, ReviewsRepositoryError> {
        let mut reviews = self.reviews.write();
        let stored = reviews
            .get_mut(&review_id)
            .ok_or(ReviewsRepositoryError::NotFound(review_id))?;
        if stored.user_id != user_id {
            return Err(ReviewsRepositoryError::NotOwner(review_id));
        }

        let mut merged = json!(stored);
        json_patch::merge(&mut merged, &json!(patch));
        let mut merged: StoredReview = serde_json::from_value(merged)?;
        merged.updated_at = epoch_seconds();
        *stored = merged;

        let updated = stored.clone();
        self.review_with_username(&updated)
    }

    async fn delete_review(
        &self,
        review_id: ReviewId,
        user_id: UserId,
    ) -> Result<(), ReviewsRepositoryError> {
        match self.reviews.write().entry(review_id) {
            Entry::Occupied(occupied) => {
                if occupied.get().user_id == user_id {
                    occupied.remove();
                    Ok(())
                } else {
                    Err(ReviewsRepositoryError::NotOwner(review_id))
                }
            }
            Entry::Vacant(_) => Err(ReviewsRepositoryError::NotFound(review_id)),
        }
    }
}

#[async_trait::async_trait]
impl UsersRepository for InMemoryStore {
    async fn add_user(&self, username: &str, token: &str) -> Result<UserId, UsersRepositoryError> {
        let mut users = self.users.write();
        if users.values().any(|user| user.username == username) {
            return Err(UsersRepositoryError::UsernameTaken(username.to_string()));
        }
        let id = self.user_sequence_generator.fetch_add(1, Ordering::Relaxed);
        users.insert(
            id,
            StoredUser {
                username: username.to_string(),
                token: token.to_string(),
            },
        );
        Ok(id)
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserAccount, UsersRepositoryError> {
        self.users
            .read()
            .get(&user_id)
            .map(|user| UserAccount {
                id: user_id,
                username: user.username.clone(),
            })
            .ok_or(UsersRepositoryError::NotFound(user_id))
    }

    async fn find_user_by_token(
        &self,
        token: &str,
    ) -> Result<Option<UserAccount>, UsersRepositoryError> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|(_, user)| user.token == token)
            .map(|(id, user)| UserAccount {
                id: *id,
                username: user.username.clone(),
            }))
    }
}
