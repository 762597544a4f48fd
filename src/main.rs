use std::env;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use placeshare::config::{self, Config, GatewayConfig};
use placeshare::controller::{self, AppState};
use placeshare::db;
use placeshare::gateway::Gateway;
use placeshare::osm::Geocoder;
use placeshare::remote::RemoteGateway;
use placeshare::repository::PlaceRepository;
use placeshare::sync::PlaceStore;

#[actix_web::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve().await,
        Some("db") => db::cli_main(&args[2..], &config::db_path()?),
        Some(action) => bail!("Unknown action {action}"),
    }
}

async fn serve() -> Result<()> {
    let config = Config::load()?;
    let public_base = format!("http://{}:{}", config.host, config.port);

    let (gateway, local): (Arc<dyn Gateway>, Option<Arc<PlaceRepository>>) = match &config.gateway {
        GatewayConfig::Remote { url, anon_key } => {
            info!(%url, "Using hosted gateway");
            let remote = RemoteGateway::new(
                url.as_str(),
                anon_key.as_str(),
                config.image_bucket.as_str(),
                config.http_timeout,
            )?;
            let remote: Arc<dyn Gateway> = Arc::new(remote);
            (remote, None)
        }
        GatewayConfig::Local { db_path } => {
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            info!(path = %db_path.display(), "Using local gateway");
            let repo = Arc::new(
                PlaceRepository::open(db_path)?.with_image_base(format!("{public_base}/images")),
            );
            let gateway: Arc<dyn Gateway> = repo.clone();
            (gateway, Some(repo))
        }
    };

    let store = Arc::new(PlaceStore::new(gateway.clone()));

    info!(backend = gateway.backend_tag(), "Initializing place store...");
    if let Err(e) = store.restore_session().await {
        warn!("Starting without a session: {e}");
    }

    let state = web::Data::new(AppState {
        store,
        geocoder: Geocoder::new(config.geocoder_url.as_str(), config.http_timeout)?,
    });
    let images = local.map(web::Data::from);

    info!("Starting server on {public_base}");

    HttpServer::new(move || {
        let app = App::new()
            .app_data(state.clone())
            .configure(controller::configure);

        match &images {
            Some(images) => app
                .app_data(images.clone())
                .configure(controller::configure_local),
            None => app,
        }
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    info!("Server shutting down...");
    Ok(())
}
