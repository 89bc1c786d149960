use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use compass_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, PgProfileStore, PgRegistrationStore, ProfileStore, RegistrationStore},
    services::providers::{
        Advisor, GroqAdvisor, NomicEmbedder, PineconeIndex, TextEmbedder, VectorIndex,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(pool.clone()));
    let registrations: Arc<dyn RegistrationStore> = Arc::new(PgRegistrationStore::new(pool));

    let embedder: Arc<dyn TextEmbedder> = Arc::new(NomicEmbedder::new(
        http_client.clone(),
        config.embed_api_key.clone(),
        config.embed_api_url.clone(),
    ));
    let index: Arc<dyn VectorIndex> = Arc::new(PineconeIndex::new(
        http_client.clone(),
        config.search_api_key.clone(),
        config.search_api_url.clone(),
    ));
    let advisor: Option<Arc<dyn Advisor>> = config.advisor_api_key.clone().map(|api_key| {
        Arc::new(GroqAdvisor::new(
            http_client,
            api_key,
            config.advisor_api_url.clone(),
            config.advisor_model.clone(),
        )) as Arc<dyn Advisor>
    });

    if advisor.is_none() {
        tracing::info!("No advisor API key configured; running without the LLM stream");
    }

    let state = AppState::new(profiles, registrations, embedder, index, advisor);
    let app = create_router(state, Duration::from_secs(config.request_deadline_secs));

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
