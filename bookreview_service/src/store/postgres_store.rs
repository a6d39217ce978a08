use anyhow::Context;
use serde_json::json;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Statement};

use crate::api::{Book, BookDetails, BookId, Review, ReviewDraft, ReviewId, ReviewPatch, UserId};
use crate::books_repository::{BookFilter, BookPage, BooksRepository, BooksRepositoryError};
use crate::pagination::PageWindow;
use crate::rating;
use crate::reviews_repository::{ReviewPage, ReviewsRepository, ReviewsRepositoryError};
use crate::store::epoch_seconds;
use crate::users_repository::{UserAccount, UsersRepository, UsersRepositoryError};

pub struct PostgresStoreConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

/// Store backed by postgres.
///
/// Free form book fields live in a JSONB column. Everything that is filtered,
/// aggregated, or constrained on has its own column, in particular the
/// (book_id, user_id) pair of a review which carries a unique constraint.
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    pub async fn init(config: PostgresStoreConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Postgres connection_str: {}", connection_str);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id              SERIAL PRIMARY KEY,
            created_by      INTEGER NOT NULL,
            created_at      BIGINT NOT NULL,
            updated_at      BIGINT NOT NULL,
            details         JSONB NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup books table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS reviews (
            id              SERIAL PRIMARY KEY,
            book_id         INTEGER NOT NULL,
            user_id         INTEGER NOT NULL,
            rating          INTEGER NOT NULL,
            text            TEXT NOT NULL,
            created_at      BIGINT NOT NULL,
            updated_at      BIGINT NOT NULL,
            UNIQUE (book_id, user_id)
            )
        ",
            )
            .await
            .context("Failed to setup reviews table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS users (
            id              SERIAL PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            token           TEXT NOT NULL UNIQUE
            )
        ",
            )
            .await
            .context("Failed to setup users table")?;

        Ok(Self { client })
    }

    async fn username_of(&self, user_id: UserId) -> Result<String, ReviewsRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT username FROM users WHERE id = $1")
            .await?;
        let rows = self.client.query(&stmt, &[&user_id]).await?;
        Ok(rows
            .first()
            .ok_or_else(|| {
                ReviewsRepositoryError::Other(format!("No account for user {}", user_id))
            })?
            .try_get(0)?)
    }
}

fn book_from_row(row: &tokio_postgres::Row) -> Result<Book, BooksRepositoryError> {
    let id: BookId = row.try_get(0)?;
    let created_by: UserId = row.try_get(1)?;
    let created_at: i64 = row.try_get(2)?;
    let updated_at: i64 = row.try_get(3)?;
    let details: serde_json::Value = row.try_get(4)?;
    let details: BookDetails = serde_json::from_value(details)?;
    Ok(Book::from_details(
        id, details, created_by, created_at, updated_at,
    ))
}

fn review_from_row(row: &tokio_postgres::Row) -> Result<Review, ReviewsRepositoryError> {
    Ok(Review {
        id: row.try_get(0)?,
        book: row.try_get(1)?,
        user: row.try_get(2)?,
        username: row.try_get(3)?,
        rating: row.try_get(4)?,
        text: row.try_get(5)?,
        created_at: row.try_get(6)?,
        updated_at: row.try_get(7)?,
    })
}

/// Escapes LIKE metacharacters so the value matches as a literal substring.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait::async_trait]
impl BooksRepository for PostgresStore {
    async fn add_book(
        &self,
        details: BookDetails,
        created_by: UserId,
    ) -> Result<Book, BooksRepositoryError> {
        let now = epoch_seconds();
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO books (created_by, created_at, updated_at, details) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&created_by, &now, &now, &json!(details)])
            .await?;

        let book_id: BookId = rows
            .first()
            .ok_or_else(|| BooksRepositoryError::Other("Id not returned".to_string()))?
            .try_get(0)?;

        Ok(Book::from_details(book_id, details, created_by, now, now))
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
        window: PageWindow,
    ) -> Result<BookPage, BooksRepositoryError> {
        // An absent filter degenerates to a match-everything pattern
        let author_pattern = filter
            .author
            .as_deref()
            .map(like_pattern)
            .unwrap_or_else(|| "%".to_string());
        let genre_pattern = filter
            .genre
            .as_deref()
            .map(like_pattern)
            .unwrap_or_else(|| "%".to_string());
        let skip = window.skip();
        let limit = window.limit;

        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, created_by, created_at, updated_at, details FROM books \
                 WHERE details->>'author' ILIKE $1 AND details->>'genre' ILIKE $2 \
                 ORDER BY created_at DESC, id DESC OFFSET $3 LIMIT $4",
            )
            .await?;
        let rows = self
            .client
            .query(&stmt, &[&author_pattern, &genre_pattern, &skip, &limit])
            .await?;
        let books = rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let count_stmt: Statement = self
            .client
            .prepare(
                "SELECT COUNT(*) FROM books \
                 WHERE details->>'author' ILIKE $1 AND details->>'genre' ILIKE $2",
            )
            .await?;
        let total: i64 = self
            .client
            .query(&count_stmt, &[&author_pattern, &genre_pattern])
            .await?
            .first()
            .ok_or_else(|| BooksRepositoryError::Other("Count not returned".to_string()))?
            .try_get(0)?;

        Ok(BookPage { books, total })
    }

    async fn search_books(
        &self,
        query: &str,
        window: PageWindow,
    ) -> Result<BookPage, BooksRepositoryError> {
        let pattern = like_pattern(query);
        let skip = window.skip();
        let limit = window.limit;

        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, created_by, created_at, updated_at, details FROM books \
                 WHERE details->>'title' ILIKE $1 OR details->>'author' ILIKE $1 \
                 ORDER BY created_at DESC, id DESC OFFSET $2 LIMIT $3",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&pattern, &skip, &limit]).await?;
        let books = rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let count_stmt: Statement = self
            .client
            .prepare(
                "SELECT COUNT(*) FROM books \
                 WHERE details->>'title' ILIKE $1 OR details->>'author' ILIKE $1",
            )
            .await?;
        let total: i64 = self
            .client
            .query(&count_stmt, &[&pattern])
            .await?
            .first()
            .ok_or_else(|| BooksRepositoryError::Other("Count not returned".to_string()))?
            .try_get(0)?;

        Ok(BookPage { books, total })
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BooksRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, created_by, created_at, updated_at, details FROM books WHERE id = $1",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&book_id]).await?;
        book_from_row(
            rows.first()
                .ok_or(BooksRepositoryError::NotFound(book_id))?,
        )
    }
}

#[async_trait::async_trait]
impl ReviewsRepository for PostgresStore {
    async fn add_review(
        &self,
        book_id: BookId,
        user_id: UserId,
        draft: ReviewDraft,
    ) -> Result<Review, ReviewsRepositoryError> {
        let book_stmt: Statement = self
            .client
            .prepare("SELECT id FROM books WHERE id = $1")
            .await?;
        if self.client.query(&book_stmt, &[&book_id]).await?.is_empty() {
            return Err(ReviewsRepositoryError::BookNotFound(book_id));
        }

        let now = epoch_seconds();
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO reviews (book_id, user_id, rating, text, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[&book_id, &user_id, &draft.rating, &draft.text, &now, &now],
            )
            .await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(err)
                if err
                    .as_db_error()
                    // This is unique constraint validation error
                    .map(|db_err| db_err.code() == &SqlState::from_code("23505"))
                    .unwrap_or_default() =>
            {
                return Err(ReviewsRepositoryError::AlreadyReviewed(book_id, user_id));
            }
            Err(other_err) => return Err(other_err.into()),
        };

        let review_id: ReviewId = rows
            .first()
            .ok_or_else(|| ReviewsRepositoryError::Other("Id not returned".to_string()))?
            .try_get(0)?;

        let username = self.username_of(user_id).await?;

        Ok(Review {
            id: review_id,
            book: book_id,
            user: user_id,
            username,
            rating: draft.rating,
            text: draft.text,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_reviews(
        &self,
        book_id: BookId,
        window: PageWindow,
    ) -> Result<ReviewPage, ReviewsRepositoryError> {
        let skip = window.skip();
        let limit = window.limit;

        let stmt: Statement = self
            .client
            .prepare(
                "SELECT reviews.id, reviews.book_id, reviews.user_id, users.username, \
                 reviews.rating, reviews.text, reviews.created_at, reviews.updated_at \
                 FROM reviews JOIN users ON users.id = reviews.user_id \
                 WHERE reviews.book_id = $1 \
                 ORDER BY reviews.created_at DESC, reviews.id DESC OFFSET $2 LIMIT $3",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&book_id, &skip, &limit]).await?;
        let reviews = rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let count_stmt: Statement = self
            .client
            .prepare("SELECT COUNT(*) FROM reviews WHERE book_id = $1")
            .await?;
        let total: i64 = self
            .client
            .query(&count_stmt, &[&book_id])
            .await?
            .first()
            .ok_or_else(|| ReviewsRepositoryError::Other("Count not returned".to_string()))?
            .try_get(0)?;

        Ok(ReviewPage { reviews, total })
    }

    async fn average_rating(&self, book_id: BookId) -> Result<f64, ReviewsRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT AVG(rating)::FLOAT8 FROM reviews WHERE book_id = $1")
            .await?;
        let rows = self.client.query(&stmt, &[&book_id]).await?;
        let average: Option<f64> = rows
            .first()
            .ok_or_else(|| ReviewsRepositoryError::Other("Average not returned".to_string()))?
            .try_get(0)?;

        Ok(rating::round_to_tenth(average.unwrap_or(0.0)))
    }

    async fn update_review(
        &self,
        review_id: ReviewId,
        user_id: UserId,
        patch: ReviewPatch,
    ) -> Result<Review, ReviewsRepositoryError> {
        let owner_stmt: Statement = self
            .client
            .prepare("SELECT user_id FROM reviews WHERE id = $1")
            .await?;
        let owner_rows = self.client.query(&owner_stmt, &[&review_id]).await?;
        let owner: UserId = owner_rows
            .first()
            .ok_or(ReviewsRepositoryError::NotFound(review_id))?
            .try_get(0)?;
        if owner != user_id {
            return Err(ReviewsRepositoryError::NotOwner(review_id));
        }

        let now = epoch_seconds();
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE reviews SET rating = COALESCE($2, rating), \
                 text = COALESCE($3, text), updated_at = $4 \
                 WHERE id = $1 \
                 RETURNING book_id, user_id, rating, text, created_at, updated_at",
            )
            .await?;
        let rows = self
            .client
            .query(&stmt, &[&review_id, &patch.rating, &patch.text, &now])
            .await?;
        let row = rows
            .first()
            .ok_or(ReviewsRepositoryError::NotFound(review_id))?;

        let username = self.username_of(user_id).await?;

        Ok(Review {
            id: review_id,
            book: row.try_get(0)?,
            user: row.try_get(1)?,
            username,
            rating: row.try_get(2)?,
            text: row.try_get(3)?,
            created_at: row.try_get(4)?,
            updated_at: row.try_get(5)?,
        })
    }

    async fn delete_review(
        &self,
        review_id: ReviewId,
        user_id: UserId,
    ) -> Result<(), ReviewsRepositoryError> {
        let owner_stmt: Statement = self
            .client
            .prepare("SELECT user_id FROM reviews WHERE id = $1")
            .await?;
        let owner_rows = self.client.query(&owner_stmt, &[&review_id]).await?;
        let owner: UserId = owner_rows
            .first()
            .ok_or(ReviewsRepositoryError::NotFound(review_id))?
            .try_get(0)?;
        if owner != user_id {
            return Err(ReviewsRepositoryError::NotOwner(review_id));
        }

        let stmt: Statement = self
            .client
            .prepare("DELETE FROM reviews WHERE id = $1 RETURNING id")
            .await?;
        let rows = self.client.query(&stmt, &[&review_id]).await?;
        if rows.is_empty() {
            // Deleted between the owner check and here
            Err(ReviewsRepositoryError::NotFound(review_id))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl UsersRepository for PostgresStore {
    async fn add_user(&self, username: &str, token: &str) -> Result<UserId, UsersRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO users (username, token) VALUES ($1, $2) RETURNING id")
            .await?;

        let rows = self.client.query(&stmt, &[&username, &token]).await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(err)
                if err
                    .as_db_error()
                    .map(|db_err| db_err.code() == &SqlState::from_code("23505"))
                    .unwrap_or_default() =>
            {
                return Err(UsersRepositoryError::UsernameTaken(username.to_string()));
            }
            Err(other_err) => return Err(other_err.into()),
        };

        Ok(rows
            .first()
            .ok_or_else(|| UsersRepositoryError::Other("Id not returned".to_string()))?
            .try_get(0)?)
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserAccount, UsersRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT username FROM users WHERE id = $1")
            .await?;
        let rows = self.client.query(&stmt, &[&user_id]).await?;
        let username: String = rows
            .first()
            .ok_or(UsersRepositoryError::NotFound(user_id))?
            .try_get(0)?;

        Ok(UserAccount {
            id: user_id,
            username,
        })
    }

    async fn find_user_by_token(
        &self,
        token: &str,
    ) -> Result<Option<UserAccount>, UsersRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, username FROM users WHERE token = $1")
            .await?;
        let rows = self.client.query(&stmt, &[&token]).await?;

        rows.first()
            .map(|row| {
                Ok(UserAccount {
                    id: row.try_get(0)?,
                    username: row.try_get(1)?,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod like_pattern_tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("tolkien"), "%tolkien%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("under_score"), "%under\\_score%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }
}

#[cfg(test)]
mod postgres_store_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use super::*;

    async fn start_postgres_container_and_init_store() -> (ContainerAsync<GenericImage>, PostgresStore)
    {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(store) = PostgresStore::init(PostgresStoreConfig {
                hostname: "127.0.0.1".to_string(),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
            })
            .await
            {
                return (_pg_container, store);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn details(title: &str, author: &str, genre: &str) -> BookDetails {
        BookDetails {
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            description: "about the book".to_string(),
            published_year: Some(1990),
            isbn: None,
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers book management against a real postgres
    /// Combined into big unit test to avoid duplicate container setup
    /// 1. Gets a book from the empty table - expects not found
    /// 2. Adds books and reads one back through the JSONB roundtrip
    /// 3. Lists with author and genre filters and a window
    /// 4. Searches by title and author fragments
    async fn test_book_management() {
        let (_container, store) = start_postgres_container_and_init_store().await;

        let not_found = store.get_book(12345).await;
        assert!(matches!(not_found, Err(BooksRepositoryError::NotFound(..))));

        let first = store
            .add_book(details("A Wizard of Earthsea", "Ursula K. Le Guin", "Fantasy"), 1)
            .await
            .unwrap();
        let second = store
            .add_book(details("The Tombs of Atuan", "Ursula K. Le Guin", "Fantasy"), 1)
            .await
            .unwrap();
        let third = store
            .add_book(details("Roadside Picnic", "Arkady Strugatsky", "Science Fiction"), 2)
            .await
            .unwrap();

        let fetched = store.get_book(first.id).await.unwrap();
        assert_eq!(fetched, first);
        assert_eq!(fetched.title, "A Wizard of Earthsea");
        assert_eq!(fetched.created_by, 1);

        // Newest first with the id as the tie breaker
        let page = store
            .list_books(&BookFilter::default(), PageWindow::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<BookId> = page.books.iter().map(|book| book.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        // Author filter is case insensitive and a substring
        let page = store
            .list_books(
                &BookFilter {
                    author: Some("le guin".to_string()),
                    genre: None,
                },
                PageWindow::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        // Filters combine with AND
        let page = store
            .list_books(
                &BookFilter {
                    author: Some("le guin".to_string()),
                    genre: Some("science".to_string()),
                },
                PageWindow::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        // Window of one
        let page = store
            .list_books(&BookFilter::default(), PageWindow { page: 2, limit: 1 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.books.len(), 1);
        assert_eq!(page.books[0].id, second.id);

        // Search hits the title or the author
        let page = store.search_books("earthsea", PageWindow::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.books[0].id, first.id);

        let page = store.search_books("strugatsky", PageWindow::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.books[0].id, third.id);

        // LIKE metacharacters in the query match literally
        let page = store.search_books("100%", PageWindow::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers the review lifecycle against a real postgres
    /// Combined into big unit test to avoid duplicate container setup
    /// 1. Creates two accounts and a book
    /// 2. Adds a review and lists it joined with the username
    /// 3. A second review by the same user trips the unique constraint
    /// 4. Averages ratings, including the empty case
    /// 5. Patches single fields and checks ownership rules
    /// 6. Deletes and checks the not found afterwards
    async fn test_review_management() {
        let (_container, store) = start_postgres_container_and_init_store().await;

        let alice = store.add_user("alice", "alice-token").await.unwrap();
        let bob = store.add_user("bob", "bob-token").await.unwrap();
        let book = store
            .add_book(details("Annihilation", "Jeff VanderMeer", "Horror"), alice)
            .await
            .unwrap();

        let empty_average = store.average_rating(book.id).await.unwrap();
        assert_eq!(empty_average, 0.0);

        let missing_book = store
            .add_review(
                book.id + 1000,
                alice,
                ReviewDraft {
                    rating: 3,
                    text: "?".to_string(),
                },
            )
            .await;
        assert!(matches!(
            missing_book,
            Err(ReviewsRepositoryError::BookNotFound(..))
        ));

        let review = store
            .add_review(
                book.id,
                alice,
                ReviewDraft {
                    rating: 4,
                    text: "unsettling".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(review.username, "alice");

        let duplicate = store
            .add_review(
                book.id,
                alice,
                ReviewDraft {
                    rating: 2,
                    text: "again".to_string(),
                },
            )
            .await;
        assert!(matches!(
            duplicate,
            Err(ReviewsRepositoryError::AlreadyReviewed(..))
        ));

        let bobs = store
            .add_review(
                book.id,
                bob,
                ReviewDraft {
                    rating: 5,
                    text: "a favourite".to_string(),
                },
            )
            .await
            .unwrap();

        let listed = store.list_reviews(book.id, PageWindow::default()).await.unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(listed.reviews[0].id, bobs.id);
        assert_eq!(listed.reviews[0].username, "bob");
        assert_eq!(listed.reviews[1].username, "alice");

        let average = store.average_rating(book.id).await.unwrap();
        assert_eq!(average, 4.5);

        // Rating only patch keeps the text
        let patched = store
            .update_review(
                review.id,
                alice,
                ReviewPatch {
                    rating: Some(2),
                    text: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.rating, 2);
        assert_eq!(patched.text, "unsettling");

        // Text only patch keeps the rating
        let patched = store
            .update_review(
                review.id,
                alice,
                ReviewPatch {
                    rating: None,
                    text: Some("grew on me".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.rating, 2);
        assert_eq!(patched.text, "grew on me");

        let not_owner = store
            .update_review(
                review.id,
                bob,
                ReviewPatch {
                    rating: Some(1),
                    text: None,
                },
            )
            .await;
        assert!(matches!(
            not_owner,
            Err(ReviewsRepositoryError::NotOwner(..))
        ));

        let missing = store.update_review(98765, alice, ReviewPatch::default()).await;
        assert!(matches!(missing, Err(ReviewsRepositoryError::NotFound(..))));

        let not_owner = store.delete_review(review.id, bob).await;
        assert!(matches!(
            not_owner,
            Err(ReviewsRepositoryError::NotOwner(..))
        ));

        store.delete_review(review.id, alice).await.unwrap();
        let gone = store.delete_review(review.id, alice).await;
        assert!(matches!(gone, Err(ReviewsRepositoryError::NotFound(..))));

        let listed = store.list_reviews(book.id, PageWindow::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.reviews[0].id, bobs.id);
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers account provisioning against a real postgres
    /// Combined into big unit test to avoid duplicate container setup
    /// 1. Creates an account and reads it back
    /// 2. A duplicate username trips the unique constraint
    /// 3. Resolves tokens, both known and unknown
    async fn test_user_management() {
        let (_container, store) = start_postgres_container_and_init_store().await;

        let missing = store.get_user(77).await;
        assert!(matches!(missing, Err(UsersRepositoryError::NotFound(..))));

        let alice = store.add_user("alice", "alice-token").await.unwrap();
        let account = store.get_user(alice).await.unwrap();
        assert_eq!(account.username, "alice");

        let taken = store.add_user("alice", "fresh-token").await;
        assert!(matches!(
            taken,
            Err(UsersRepositoryError::UsernameTaken(..))
        ));

        let resolved = store.find_user_by_token("alice-token").await.unwrap();
        assert_eq!(
            resolved,
            Some(UserAccount {
                id: alice,
                username: "alice".to_string()
            })
        );

        let unknown = store.find_user_by_token("who-is-this").await.unwrap();
        assert!(unknown.is_none());
    }
}
