use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(web::resource("/").route(web::get().to(handlers::index)))
        .service(
            web::scope("/api")
                .service(web::resource("/search").route(web::get().to(handlers::search_books)))
                .service(
                    web::scope("/books")
                        .service(
                            web::resource("")
                                .route(web::get().to(handlers::list_books))
                                .route(web::post().to(handlers::add_book)),
                        )
                        .service(
                            web::scope("/{book_id}")
                                .service(web::resource("").route(web::get().to(handlers::get_book)))
                                .service(
                                    web::resource("/reviews")
                                        .route(web::post().to(handlers::add_review)),
                                ),
                        ),
                )
                .service(
                    web::scope("/reviews").service(
                        web::resource("/{review_id}")
                            .route(web::put().to(handlers::update_review))
                            .route(web::delete().to(handlers::delete_review)),
                    ),
                ),
        );
}
