use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{
    Book, BookDetailPage, BookDetails, BookId, BookListPage, ErrorMessage, Review, ReviewDraft,
    ReviewId, ReviewPatch,
};

pub struct BookReviewClient {
    url: String,
    client: ClientWithMiddleware,
}

async fn error_message(response: reqwest::Response) -> String {
    response
        .json::<ErrorMessage>()
        .await
        .map(|body| body.message)
        .unwrap_or_default()
}

fn page_params(page: Option<i64>, limit: Option<i64>) -> Vec<(&'static str, String)> {
    let mut params = vec![];
    if let Some(page) = page {
        params.push(("page", page.to_string()));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

impl BookReviewClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls POST /api/books endpoint
    /// Returns the created book
    pub async fn add_book(&self, token: &str, details: &BookDetails) -> anyhow::Result<Book> {
        let response = self
            .client
            .post(format!("{}/api/books", self.url))
            .bearer_auth(token)
            .json(details)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("Failed to add book {} {}", status, error_message(response).await)
        }

        Ok(response.json().await?)
    }

    /// Calls GET /api/books endpoint
    /// Author and genre filter the listing, page and limit window it
    pub async fn list_books(
        &self,
        author: Option<&str>,
        genre: Option<&str>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> anyhow::Result<BookListPage> {
        let mut params = page_params(page, limit);
        if let Some(author) = author {
            params.push(("author", author.to_string()));
        }
        if let Some(genre) = genre {
            params.push(("genre", genre.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/books", self.url))
            .query(&params)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            bail!("Failed to list books {} {}", status, error_message(response).await)
        }
    }

    /// Calls GET /api/books/{book_id} endpoint
    /// Page and limit window the reviews of the book
    /// Returns None if the book was not present
    pub async fn get_book(
        &self,
        book_id: BookId,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> anyhow::Result<Option<BookDetailPage>> {
        let response = self
            .client
            .get(format!("{}/api/books/{}", self.url, book_id))
            .query(&page_params(page, limit))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let status = response.status();
            bail!("Failed to get book {} {}", status, error_message(response).await)
        }
    }

    /// Calls GET /api/search endpoint
    pub async fn search_books(
        &self,
        query: &str,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> anyhow::Result<BookListPage> {
        let mut params = page_params(page, limit);
        params.push(("query", query.to_string()));

        let response = self
            .client
            .get(format!("{}/api/search", self.url))
            .query(&params)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            bail!("Failed to search books {} {}", status, error_message(response).await)
        }
    }

    /// Calls POST /api/books/{book_id}/reviews endpoint
    /// Returns the created review, or None if the book was not present
    /// A repeated review of the same book fails with the server's message
    pub async fn add_review(
        &self,
        token: &str,
        book_id: BookId,
        draft: &ReviewDraft,
    ) -> anyhow::Result<Option<Review>> {
        let response = self
            .client
            .post(format!("{}/api/books/{}/reviews", self.url, book_id))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let status = response.status();
            bail!("Failed to add review {} {}", status, error_message(response).await)
        }
    }

    /// Calls PUT /api/reviews/{review_id} endpoint
    /// Returns the updated review, or None if the review was not present
    pub async fn update_review(
        &self,
        token: &str,
        review_id: ReviewId,
        patch: &ReviewPatch,
    ) -> anyhow::Result<Option<Review>> {
        let response = self
            .client
            .put(format!("{}/api/reviews/{}", self.url, review_id))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let status = response.status();
            bail!("Failed to update review {} {}", status, error_message(response).await)
        }
    }

    /// Calls DELETE /api/reviews/{review_id} endpoint
    /// Returns true if removed and false if the caller does not own the review
    pub async fn delete_review(&self, token: &str, review_id: ReviewId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/reviews/{}", self.url, review_id))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            let status = response.status();
            bail!("Failed to delete review {} {}", status, error_message(response).await)
        }
    }
}
