//! Listener Application
//!
//! Picks the highest-priority live masjid from the subscriptions, connects
//! to its feed, and falls back to the stored azaan recording when no live
//! feed is reachable.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use azaan_streamer::{
    auth::AuthClient,
    config::AppConfig,
    failover::{FailoverCoordinator, FeedFactory, ListenState},
    net::StreamReceiver,
    offline::OfflineAzaanPlayer,
    priority::PriorityRegistry,
    registry::RegistryClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting azaan listener");

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args
        .next()
        .unwrap_or_else(|| "9443".to_string())
        .parse()
        .context("Invalid relay port")?;
    let default_prayer = args.next().unwrap_or_else(|| "fajr".to_string());

    let mut config = load_config()?;
    config.stream.host = host;
    config.stream.port = port;

    let mut auth = AuthClient::new(&config.auth)?;
    let registry_client = RegistryClient::new(&config.registry)?;

    let email = std::env::var("AZAAN_EMAIL").context("AZAAN_EMAIL is not set")?;
    let password = std::env::var("AZAAN_PASSWORD").context("AZAAN_PASSWORD is not set")?;
    let session = auth.login(&email, &password).await?;
    tracing::info!("Signed in as {}", session.email);

    // Seed subscriptions from the stored profile
    let token = auth.require_token().await?;
    let profile = registry_client.get_user(&token, &session.user_id).await?;
    let mut priorities = PriorityRegistry::new();
    priorities.import(profile.priorities);
    if priorities.is_empty() {
        tracing::warn!("No subscription priorities stored; every masjid is ignored");
    }

    let live = registry_client.live_group_ids(&token).await?;
    tracing::info!("{} masjid(s) currently live", live.len());

    // Every feed goes through the same relay endpoint; the registry only
    // decides which masjid's stream to ask for.
    let feed_config = config.stream.clone();
    let factory: FeedFactory<StreamReceiver> = Box::new(move |group_id: &str| {
        tracing::info!("Connecting to feed for {}", group_id);
        Ok(StreamReceiver::new(feed_config.clone()))
    });

    let offline = OfflineAzaanPlayer::new(&config.offline.assets_dir);
    let mut coordinator =
        FailoverCoordinator::new(priorities, factory, offline, default_prayer);

    match coordinator.listen(&live)? {
        ListenState::Listening { group_id } => {
            tracing::info!("Listening to live azaan from {}", group_id)
        }
        ListenState::OfflineFallback { prayer } => {
            tracing::info!("No live feed; playing stored azaan for {}", prayer)
        }
        state => tracing::info!("Listener state: {:?}", state),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Stopping listener");
    coordinator.stop();

    // Persist any priority changes made during the session
    let token = auth.require_token().await?;
    if let Err(e) = registry_client
        .update_user_priorities(&token, &session.user_id, &coordinator.export_priorities())
        .await
    {
        tracing::warn!("Could not persist priorities: {}", e);
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let path = std::env::var("AZAAN_CONFIG").unwrap_or_else(|_| "azaan.toml".to_string());
    let mut config = AppConfig::load_or_default(std::path::Path::new(&path))?;

    if let Ok(api_key) = std::env::var("AZAAN_API_KEY") {
        config.auth.api_key = api_key;
    }
    if let Ok(project_id) = std::env::var("AZAAN_PROJECT_ID") {
        config.registry.project_id = project_id;
    }
    if let Ok(ca_cert) = std::env::var("AZAAN_CA_CERT") {
        config.stream.ca_cert = Some(ca_cert.into());
    }
    if let Ok(assets) = std::env::var("AZAAN_ASSETS_DIR") {
        config.offline.assets_dir = assets.into();
    }
    Ok(config)
}
