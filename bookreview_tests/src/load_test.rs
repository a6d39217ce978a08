use rand::prelude::SliceRandom;
use rand::{thread_rng, Rng};

use bookreview_service::api::{BookDetails, ReviewDraft};
use bookreview_service::client::BookReviewClient;

/// Tokens of the accounts the target instance was seeded with.
const SEED_TOKENS: [&str; 3] = ["alice-token", "bob-token", "carol-token"];

#[tokio::test]
async fn generate_lots_of_books_and_reviews() {
    const NO_OF_BOOKS_TO_GENERATE: usize = 25;
    const PAGE_LIMIT: i64 = 7;

    let mut rng = thread_rng();
    let bookreview_url = "http://127.0.0.1:8080";

    let client = BookReviewClient::new(bookreview_url).expect("Failed to create client");

    let books = generate_books(&mut rng, NO_OF_BOOKS_TO_GENERATE);

    let mut book_ids = vec![];
    for book in books {
        let added = client
            .add_book(SEED_TOKENS[0], &book)
            .await
            .expect("Failed to add book");
        book_ids.push(added.id);

        println!("Added book {}", added.id);
    }

    // Every book gets reviews from a random prefix of the seeded accounts,
    // one review per account so no request trips the duplicate rule
    for book_id in &book_ids {
        let mut tokens = SEED_TOKENS.to_vec();
        tokens.shuffle(&mut rng);
        for token in tokens.iter().take(rng.gen_range(0..=tokens.len())) {
            let review = client
                .add_review(
                    token,
                    *book_id,
                    &ReviewDraft {
                        rating: rng.gen_range(1..=5),
                        text: "Generated while load testing".to_string(),
                    },
                )
                .await
                .expect("Failed to add review")
                .expect("Book not found");
            println!("Added review {} for book {}", review.id, book_id);
        }

        let detail = client
            .get_book(*book_id, None, None)
            .await
            .expect("Failed to get book")
            .expect("Book not found");
        assert!((0.0..=5.0).contains(&detail.average_rating));
    }

    // Page through the whole listing and check the window maths adds up
    let first_page = client
        .list_books(None, None, Some(1), Some(PAGE_LIMIT))
        .await
        .expect("Failed to list books");
    assert!(first_page.total_books >= NO_OF_BOOKS_TO_GENERATE as i64);

    let mut seen = 0;
    let mut page = 1;
    loop {
        let listing = client
            .list_books(None, None, Some(page), Some(PAGE_LIMIT))
            .await
            .expect("Failed to list books");
        if listing.books.is_empty() {
            break;
        }
        seen += listing.books.len() as i64;
        page += 1;
    }
    assert_eq!(seen, first_page.total_books);
    assert_eq!(page - 1, first_page.total_pages);
}

fn generate_books(rng: &mut impl Rng, no_of_books_to_generate: usize) -> Vec<BookDetails> {
    (0..no_of_books_to_generate)
        .map(|no| BookDetails {
            title: format!("A tale of number {} and {}", no, rng.gen_range(0..1000)),
            author: format!(
                "{} {}",
                FIRST_NAMES.choose(rng).unwrap(),
                LAST_NAMES.choose(rng).unwrap()
            ),
            genre: GENRES.choose(rng).unwrap().to_string(),
            description: "Some long description that is long".to_string(),
            published_year: Some(rng.gen_range(1950..2024)),
            isbn: None,
        })
        .collect()
}

/// List of first names, based on most popular names list
const FIRST_NAMES: [&str; 16] = [
    "Ryan", "Dorothy", "Jacob", "Amy", "Nicholas", "Kathleen", "Gary", "Angela", "Eric",
    "Shirley", "Jonathan", "Emma", "Stephen", "Brenda", "Larry", "Pamela",
];

/// List of last names, based on most popular names list
const LAST_NAMES: [&str; 16] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas",
];

const GENRES: [&str; 8] = [
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Romance",
    "Horror",
    "Biography",
    "History",
    "Poetry",
];
