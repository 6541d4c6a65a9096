use anyhow::Context;
use compound_ledger::orchestration::{run_feed, EventProcessor, EventWriter};
use compound_ledger::{api, init_db, ChainReader, Config, Deployment, Engine, Repository, RpcChainReader};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncRead;

const WRITER_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pool = init_db(&config.database_path)
        .await
        .context("failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));

    let mut deployment = Deployment::compound_v2_mainnet();
    if let Some(comptroller) = config.comptroller_address.clone() {
        deployment = deployment.with_comptroller(comptroller);
    }
    let chain: Arc<dyn ChainReader> = Arc::new(
        RpcChainReader::new(&config.rpc_url).context("failed to create RPC client")?,
    );
    let engine = Engine::new(chain, Arc::new(deployment), config.pricing_mode);
    tracing::info!(pricing = %config.pricing_mode, "Engine configured");

    let (writer, writer_task) =
        EventWriter::spawn(EventProcessor::new(repo.clone(), engine), WRITER_QUEUE_CAPACITY);

    let source: Box<dyn AsyncRead + Unpin + Send> = match &config.events_path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open event feed {}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let feed = tokio::spawn(async move {
        let result = run_feed(source, &writer).await;
        drop(writer);
        result
    });

    let app = api::create_router(api::AppState::new(repo));
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    match feed.await.context("feed task panicked")? {
        Ok(summary) => tracing::info!(?summary, "Event feed drained"),
        Err(e) => tracing::error!(error = %e, "Event feed stopped"),
    }
    writer_task.await.context("writer task panicked")?;

    // Queries stay available after the feed ends.
    server
        .await
        .context("server task panicked")?
        .context("server error")?;
    Ok(())
}
