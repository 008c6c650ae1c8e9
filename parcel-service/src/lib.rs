pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use services::{ParcelRepository, PaymentCoordinator, PaymentLedger, StripeClient};

/// Shared application state. Store handles are constructed once here
/// and passed in explicitly; nothing holds a process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub parcels: ParcelRepository,
    pub ledger: PaymentLedger,
    pub stripe: StripeClient,
    pub coordinator: PaymentCoordinator,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: mongodb::Database,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some("parcel-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let parcels = ParcelRepository::new(&db);
        let ledger = PaymentLedger::new(&db);
        parcels.init_indexes().await?;
        ledger.init_indexes().await?;

        let stripe = StripeClient::new(config.stripe.clone())?;
        let coordinator = PaymentCoordinator::new(parcels.clone(), ledger.clone());

        // Settle anything a previous run left half-done before taking
        // traffic.
        match coordinator.reconcile_pending().await {
            Ok(summary) => {
                if summary.applied > 0 || summary.rejected > 0 || summary.skipped > 0 {
                    tracing::info!(
                        applied = summary.applied,
                        rejected = summary.rejected,
                        skipped = summary.skipped,
                        "startup reconciliation finished"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "startup reconciliation failed; sweep can be re-run via POST /reconcile");
            }
        }

        let cors = build_cors_layer(&config.cors.allowed_origins)?;

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            parcels,
            ledger,
            stripe,
            coordinator,
        };

        let router = Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health_check))
            .route(
                "/parcels",
                post(handlers::parcels::create_parcel).get(handlers::parcels::list_parcels),
            )
            .route(
                "/parcels/:id",
                get(handlers::parcels::get_parcel)
                    .patch(handlers::parcels::update_parcel)
                    .delete(handlers::parcels::delete_parcel),
            )
            .route(
                "/create-payment-intent",
                post(handlers::payments::create_payment_intent),
            )
            .route("/payments", post(handlers::payments::confirm_payment))
            .route(
                "/payment-history",
                get(handlers::payments::payment_history),
            )
            .route("/reconcile", post(handlers::payments::reconcile))
            .layer(cors)
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 picks a free port, used by the test harness.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}

fn build_cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("invalid CORS origin: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}
