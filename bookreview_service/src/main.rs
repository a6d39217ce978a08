use std::sync::Arc;

use actix_web::{App, HttpServer};
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use bookreview_service::app_config::config_app;
use bookreview_service::auth::{Authenticator, TokenAuthenticator};
use bookreview_service::books_repository::BooksRepository;
use bookreview_service::reviews_repository::ReviewsRepository;
use bookreview_service::settings::Settings;
use bookreview_service::store::{InMemoryStore, PostgresStore, PostgresStoreConfig};
use bookreview_service::users_repository::{UsersRepository, UsersRepositoryError};

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() {
    let app_name = "bookreview_service";

    // Start a new Jaeger trace pipeline.
    // Spans are exported in batch - recommended setup for a production application.
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .expect("Failed to install OpenTelemetry tracer.");

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Create a `tracing` layer using the Jaeger tracer
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    // Create a `tracing` layer to emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    // Combined them all together in a `tracing` subscriber
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    let settings = Settings::load().expect("Failed to load settings");
    println!(
        "starting HTTP server at http://{}:{}",
        settings.bind_address, settings.bind_port
    );

    let (books_repository, reviews_repository, users_repository): (
        Arc<dyn BooksRepository>,
        Arc<dyn ReviewsRepository>,
        Arc<dyn UsersRepository>,
    ) = if settings.use_in_memory_db {
        let store = Arc::new(InMemoryStore::default());
        (store.clone(), store.clone(), store)
    } else {
        let store = Arc::new(
            PostgresStore::init(PostgresStoreConfig {
                hostname: settings.db_host.clone(),
                username: settings.db_username.clone(),
                password: settings.db_password.clone(),
            })
            .await
            .expect("Failed to init postgres"),
        );
        (store.clone(), store.clone(), store)
    };

    for (username, token) in settings.parsed_seed_users() {
        match users_repository.add_user(&username, &token).await {
            Ok(user_id) => tracing::info!("Seeded user {} with id {}", username, user_id),
            Err(UsersRepositoryError::UsernameTaken(_)) => {
                tracing::info!("Seed user {} already present", username)
            }
            Err(err) => panic!("Failed to seed user {}: {}", username, err),
        }
    }

    let authenticator: Arc<dyn Authenticator> =
        Arc::new(TokenAuthenticator::new(users_repository.clone()));

    let bind_address = (settings.bind_address.clone(), settings.bind_port);
    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(books_repository.clone()))
            .app_data(web::Data::new(reviews_repository.clone()))
            .app_data(web::Data::new(authenticator.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(bind_address)?
    .run()
    .await
}
