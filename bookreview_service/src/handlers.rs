use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{Error, HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    ApiMessage, BookDetailPage, BookDetails, BookId, BookListPage, ErrorMessage, ListBooksQuery,
    PageQuery, ReviewDraft, ReviewId, ReviewPatch, SearchQuery,
};
use crate::auth::{authenticate_request, AuthError, Authenticator};
use crate::books_repository::{BookFilter, BooksRepository, BooksRepositoryError};
use crate::pagination::PageWindow;
use crate::reviews_repository::{ReviewsRepository, ReviewsRepositoryError};
use crate::validation;

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorMessage {
        message,
        error: None,
    })
}

fn not_found(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorMessage {
        message: message.to_string(),
        error: None,
    })
}

fn forbidden(message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(ErrorMessage {
        message: message.to_string(),
        error: None,
    })
}

fn server_error(err: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorMessage {
        message: "Server error".to_string(),
        error: Some(err.to_string()),
    })
}

fn auth_failure(err: AuthError) -> HttpResponse {
    match err {
        AuthError::MissingToken | AuthError::InvalidToken => {
            HttpResponse::Unauthorized().json(ErrorMessage {
                message: err.to_string(),
                error: None,
            })
        }
        AuthError::Backend(_) => {
            tracing::error!("Authentication failed {}", err);
            server_error(err)
        }
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn index() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().body("Book Review API is running"))
}

#[api_v2_operation]
pub async fn add_book(
    req: HttpRequest,
    authenticator: Data<Arc<dyn Authenticator>>,
    books_repository: Data<Arc<dyn BooksRepository>>,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    let user = match authenticate_request(&req, authenticator.get_ref().as_ref()).await {
        Ok(user) => user,
        Err(err) => return Ok(auth_failure(err)),
    };

    let details = match validation::validate_book_details(details.into_inner()) {
        Ok(details) => details,
        Err(err) => return Ok(bad_request(err.to_string())),
    };

    Ok(match books_repository.add_book(details, user.user_id).await {
        Ok(book) => HttpResponse::Created().json(book),
        Err(err) => {
            tracing::error!("Add book failed {}", err);
            server_error(err)
        }
    })
}

#[api_v2_operation]
pub async fn list_books(
    books_repository: Data<Arc<dyn BooksRepository>>,
    query: web::Query<ListBooksQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let window = PageWindow::from_query(query.page.as_deref(), query.limit.as_deref());
    let filter = BookFilter {
        author: query.author,
        genre: query.genre,
    };

    Ok(match books_repository.list_books(&filter, window).await {
        Ok(page) => HttpResponse::Ok().json(BookListPage {
            books: page.books,
            total_pages: window.total_pages(page.total),
            current_page: window.page,
            total_books: page.total,
        }),
        Err(err) => {
            tracing::error!("List books failed {}", err);
            server_error(err)
        }
    })
}

#[api_v2_operation]
pub async fn search_books(
    books_repository: Data<Arc<dyn BooksRepository>>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let search_term = match query.query.as_deref() {
        Some(term) if !term.is_empty() => term,
        _ => return Ok(bad_request("Search query is required".to_string())),
    };
    let window = PageWindow::from_query(query.page.as_deref(), query.limit.as_deref());

    Ok(match books_repository.search_books(search_term, window).await {
        Ok(page) => HttpResponse::Ok().json(BookListPage {
            books: page.books,
            total_pages: window.total_pages(page.total),
            current_page: window.page,
            total_books: page.total,
        }),
        Err(err) => {
            tracing::error!("Search books failed {}", err);
            server_error(err)
        }
    })
}

/// Book detail together with one page of its reviews.
///
/// The page and limit parameters window the reviews, not the book.
#[api_v2_operation]
pub async fn get_book(
    books_repository: Data<Arc<dyn BooksRepository>>,
    reviews_repository: Data<Arc<dyn ReviewsRepository>>,
    book_id: web::Path<BookId>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    let window = PageWindow::from_query(query.page.as_deref(), query.limit.as_deref());

    let book = match books_repository.get_book(book_id).await {
        Ok(book) => book,
        Err(BooksRepositoryError::NotFound(_)) => return Ok(not_found("Book not found")),
        Err(err) => {
            tracing::error!("Get book failed {}", err);
            return Ok(server_error(err));
        }
    };

    let reviews = match reviews_repository.list_reviews(book_id, window).await {
        Ok(page) => page,
        Err(err) => {
            tracing::error!("List reviews failed {}", err);
            return Ok(server_error(err));
        }
    };

    let average_rating = match reviews_repository.average_rating(book_id).await {
        Ok(average) => average,
        Err(err) => {
            tracing::error!("Average rating failed {}", err);
            return Ok(server_error(err));
        }
    };

    Ok(HttpResponse::Ok().json(BookDetailPage {
        book,
        reviews: reviews.reviews,
        average_rating,
        total_reviews: reviews.total,
        total_pages: window.total_pages(reviews.total),
        current_page: window.page,
    }))
}

#[api_v2_operation]
pub async fn add_review(
    req: HttpRequest,
    authenticator: Data<Arc<dyn Authenticator>>,
    reviews_repository: Data<Arc<dyn ReviewsRepository>>,
    book_id: web::Path<BookId>,
    draft: web::Json<ReviewDraft>,
) -> Result<HttpResponse, Error> {
    let user = match authenticate_request(&req, authenticator.get_ref().as_ref()).await {
        Ok(user) => user,
        Err(err) => return Ok(auth_failure(err)),
    };

    let draft = draft.into_inner();
    if let Err(err) = validation::validate_rating(draft.rating) {
        return Ok(bad_request(err.to_string()));
    }

    Ok(
        match reviews_repository
            .add_review(book_id.into_inner(), user.user_id, draft)
            .await
        {
            Ok(review) => HttpResponse::Created().json(review),
            Err(ReviewsRepositoryError::BookNotFound(_)) => not_found("Book not found"),
            Err(ReviewsRepositoryError::AlreadyReviewed(..)) => {
                bad_request("You have already reviewed this book".to_string())
            }
            Err(err) => {
                tracing::error!("Add review failed {}", err);
                server_error(err)
            }
        },
    )
}

#[api_v2_operation]
pub async fn update_review(
    req: HttpRequest,
    authenticator: Data<Arc<dyn Authenticator>>,
    reviews_repository: Data<Arc<dyn ReviewsRepository>>,
    review_id: web::Path<ReviewId>,
    patch: web::Json<ReviewPatch>,
) -> Result<HttpResponse, Error> {
    let user = match authenticate_request(&req, authenticator.get_ref().as_ref()).await {
        Ok(user) => user,
        Err(err) => return Ok(auth_failure(err)),
    };

    let patch = patch.into_inner();
    if let Some(rating) = patch.rating {
        if let Err(err) = validation::validate_rating(rating) {
            return Ok(bad_request(err.to_string()));
        }
    }

    Ok(
        match reviews_repository
            .update_review(review_id.into_inner(), user.user_id, patch)
            .await
        {
            Ok(review) => HttpResponse::Ok().json(review),
            Err(ReviewsRepositoryError::NotFound(_)) => not_found("Review not found"),
            Err(ReviewsRepositoryError::NotOwner(_)) => {
                forbidden("Not authorized to update this review")
            }
            Err(err) => {
                tracing::error!("Update review failed {}", err);
                server_error(err)
            }
        },
    )
}

#[api_v2_operation]
pub async fn delete_review(
    req: HttpRequest,
    authenticator: Data<Arc<dyn Authenticator>>,
    reviews_repository: Data<Arc<dyn ReviewsRepository>>,
    review_id: web::Path<ReviewId>,
) -> Result<HttpResponse, Error> {
    let user = match authenticate_request(&req, authenticator.get_ref().as_ref()).await {
        Ok(user) => user,
        Err(err) => return Ok(auth_failure(err)),
    };

    Ok(
        match reviews_repository
            .delete_review(review_id.into_inner(), user.user_id)
            .await
        {
            Ok(()) => HttpResponse::Ok().json(ApiMessage {
                message: "Review removed".to_string(),
            }),
            Err(ReviewsRepositoryError::NotFound(_)) => not_found("Review not found"),
            Err(ReviewsRepositoryError::NotOwner(_)) => {
                forbidden("Not authorized to delete this review")
            }
            Err(err) => {
                tracing::error!("Delete review failed {}", err);
                server_error(err)
            }
        },
    )
}
