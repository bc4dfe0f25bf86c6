use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use portfolio_chat::api::{create_router, AppState, JobProducer};
use portfolio_chat::application::{
    BackgroundEvaluator, ChatService, ChatSettings, DocumentService, EvaluationService, RagService,
};
use portfolio_chat::domain::ports::EvaluationScheduler;
use portfolio_chat::infrastructure::{
    build_llm, create_pool, persistence::sqlite, telemetry, AppConfig, EvaluationMode,
    QdrantVectorStore, SqliteStore, TextEmbedding,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load()?;
    let config = &app_config.config;
    telemetry::init_tracing("api=debug,portfolio_chat=debug,tower_http=info", config.logging.format);
    app_config.log_summary();

    let db_pool = sqlite::connect(&config.database_url).await?;
    let store = Arc::new(SqliteStore::new(db_pool.clone()));
    info!("database ready");

    let embedding = Arc::new(TextEmbedding::from_config(&config.embedding));
    let vector_store = Arc::new(
        QdrantVectorStore::new(&config.qdrant_url, &config.rag.collection, config.embedding.dimension)
            .await?,
    );
    info!("Qdrant connected");
    let rag = Arc::new(RagService::new(embedding, vector_store));

    let generator = build_llm(&config.llm.provider, &config.llm.model)?;
    let mut chat = ChatService::new(
        store.clone(),
        rag.clone(),
        generator,
        ChatSettings::from_config(&app_config),
    );

    let mut job_producer = None;
    if config.evaluation.enabled {
        let scheduler: Arc<dyn EvaluationScheduler> = match config.evaluation.mode {
            EvaluationMode::Inline => {
                let judge = build_llm(&config.llm.provider, app_config.judge_model())?;
                let evaluator = EvaluationService::from_config(judge, store.clone(), &app_config);
                Arc::new(BackgroundEvaluator::new(Arc::new(evaluator)))
            }
            EvaluationMode::Queue => {
                let pool = create_pool(&config.redis_url)?;
                let producer = JobProducer::new(pool, config.worker.result_ttl_seconds);
                job_producer = Some(producer.clone());
                Arc::new(producer)
            }
        };
        info!(mode = ?config.evaluation.mode, judge = app_config.judge_model(), "evaluation enabled");
        chat = chat.with_evaluator(scheduler);
    }

    let documents = Arc::new(DocumentService::new(store.clone(), rag, config.rag.chunk_size));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let mut state = AppState::new(
        app_config.clone(),
        Arc::new(chat),
        store.clone(),
        store,
        documents,
    )
    .with_database(db_pool);
    if let Some(producer) = job_producer {
        state = state.with_job_producer(producer);
    }
    if state.config.config.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY is not set; admin routes will refuse every request");
    }

    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
