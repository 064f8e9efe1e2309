//! Storefront client host: in-process collaborators behind a JSON API.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_client::adapters::{FileStorage, MemoryAuthProvider, MemoryDocumentStore, SeedData};
use storefront_client::session::DocumentAdminRegistry;
use storefront_client::{routes, Collaborators, Listeners, Storefront, StorefrontConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StorefrontConfig::from_env()?;
    let docs = Arc::new(MemoryDocumentStore::new());
    let auth = Arc::new(MemoryAuthProvider::new());
    if let Some(path) = &config.seed {
        SeedData::from_path(path)?.apply(&docs, &auth);
    }
    std::fs::create_dir_all(&config.data_dir)?;

    let collaborators = Collaborators {
        documents: docs.clone(),
        auth,
        registry: Arc::new(DocumentAdminRegistry::new(docs)),
        storage: Arc::new(FileStorage::new(&config.data_dir)),
    };
    let shared = Storefront::new(&collaborators, config.keys.clone(), config.checkout.clone()).into_shared();
    let listeners = Listeners::start(shared.clone(), &collaborators).await;

    let app = routes::router(shared);
    let addr = config.socket_addr();
    tracing::info!("Storefront client listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    listeners.shutdown().await;
    tracing::info!("Storefront client stopped");
    Ok(())
}
