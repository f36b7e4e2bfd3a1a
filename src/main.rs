use scryer::{
    AgentPipeline, AppState, ChannelBroadcaster, Config, GroqClient, JobQueue, MemoryTaskStore,
    ResearchProcessor, ResearchService, SearchAggregator, TavilyClient,
    api::create_router,
    broadcast::SharedBroadcaster,
    queue::spawn_workers,
    store::TaskStore,
};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "scryer=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config error: {}", e))?;

    let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
    let broadcaster: SharedBroadcaster = Arc::new(ChannelBroadcaster::new());

    let llm = Arc::new(GroqClient::new(
        config.providers.groq_api_key.clone(),
        config.providers.groq_model.clone(),
    ));
    let aggregator = SearchAggregator::new(Arc::new(TavilyClient::new(
        config.providers.tavily_api_key.clone(),
    )));
    let pipeline = Arc::new(AgentPipeline::new(llm, aggregator));

    let (queue, jobs) = JobQueue::new(config.workers.queue_capacity);
    let processor = Arc::new(ResearchProcessor::new(
        store.clone(),
        pipeline,
        broadcaster.clone(),
    ));
    spawn_workers(processor, jobs, config.workers.count);

    let state = AppState {
        research: Arc::new(ResearchService::new(store, queue)),
        broadcaster,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, workers = config.workers.count, "scryer listening");

    axum::serve(listener, create_router().with_state(state)).await?;

    Ok(())
}
