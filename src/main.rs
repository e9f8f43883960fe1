use axum::routing::{get, post};
use axum::Router;
use payments_ledger::config::AppConfig;
use payments_ledger::gateway::omise::OmiseGateway;
use payments_ledger::gateway::GatewayClient;
use payments_ledger::ledger::store_pg::PgLedgerStore;
use payments_ledger::ledger::Ledger;
use payments_ledger::repo::transactions_repo::TransactionsRepo;
use payments_ledger::service::dispatcher::ChargeDispatcher;
use payments_ledger::service::reconciler::WebhookReconciler;
use payments_ledger::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    if cfg.omise_public_key.is_empty() || cfg.omise_secret_key.is_empty() {
        anyhow::bail!("OMISE_PUBLIC_KEY and OMISE_SECRET_KEY must be set");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let gateway: Arc<dyn GatewayClient> = Arc::new(OmiseGateway {
        api_base: cfg.omise_api_base.clone(),
        vault_base: cfg.omise_vault_base.clone(),
        public_key: cfg.omise_public_key.clone(),
        secret_key: cfg.omise_secret_key.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
        client: reqwest::Client::new(),
    });

    let ledger = Ledger {
        store: Arc::new(PgLedgerStore { pool: pool.clone() }),
    };
    let dispatcher = ChargeDispatcher {
        gateway: gateway.clone(),
    };
    let reconciler = WebhookReconciler {
        gateway,
        ledger: ledger.clone(),
    };
    let transactions_repo = TransactionsRepo { pool };

    let state = AppState {
        dispatcher,
        reconciler,
        ledger,
        transactions_repo,
    };

    let app = Router::new()
        .route("/health", get(payments_ledger::http::handlers::charges::health))
        .route("/charges", post(payments_ledger::http::handlers::charges::create_charge))
        .route("/webhooks", post(payments_ledger::http::handlers::webhooks::handle_webhook))
        .route(
            "/transactions",
            get(payments_ledger::http::handlers::transactions::list_transactions),
        )
        .route(
            "/transactions/:id",
            get(payments_ledger::http::handlers::transactions::get_transaction),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
