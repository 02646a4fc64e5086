use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use zarpe_server::config::Config;
use zarpe_server::repositories::{
    PgReservationRepository, PgTourRepository, PgUserDirectory, ReservationRepository,
    TourRepository, UserDirectory,
};
use zarpe_server::routes::create_routes;
use zarpe_server::services::{
    PaymentGateway, PaymentWebhookReconciler, ReservationService, SignatureVerifier, StripeGateway,
    StripeSignatureVerifier,
};
use zarpe_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Arc::new(Config::from_env());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let reservations: Arc<dyn ReservationRepository> =
        Arc::new(PgReservationRepository::new(pool.clone()));
    let tours: Arc<dyn TourRepository> = Arc::new(PgTourRepository::new(pool.clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool));

    let service = Arc::new(ReservationService::new(reservations.clone(), tours));
    let reconciler = Arc::new(PaymentWebhookReconciler::new(
        service.clone(),
        reservations,
        users,
    ));
    let verifier: Arc<dyn SignatureVerifier> = Arc::new(StripeSignatureVerifier::new(
        config.stripe_webhook_secret.clone(),
    ));
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(StripeGateway::new(config.stripe_secret_key.clone()));

    let app = create_routes(AppState {
        reservations: service,
        reconciler,
        verifier,
        gateway,
        config: config.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
