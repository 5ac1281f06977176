use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use hookline::server::{self, AppState};
use hookline::store::{EventStore, HttpStore, MemoryStore};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "8080")]
    port: u16,

    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Base URL of an external document store; in-memory history when unset.
    #[arg(long, env = "EVENT_STORE_URL")]
    store_url: Option<String>,

    /// How many events the in-memory store keeps.
    #[arg(long, default_value = "256")]
    history: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let store: Arc<dyn EventStore> = match &args.store_url {
        Some(url) => {
            info!("using external document store at {}", url);
            Arc::new(HttpStore::new(reqwest::Client::new(), url.clone()))
        }
        None => {
            warn!(
                "no document store configured - keeping the last {} events in memory",
                args.history
            );
            Arc::new(MemoryStore::new(args.history))
        }
    };

    let app = server::router(AppState { store });

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!("GitHub event recorder listening on {}", addr);
    axum::serve(listener, app).await.unwrap();
}
