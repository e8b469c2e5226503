pub mod cli;
pub mod core;
pub mod providers;
pub mod refresh;
pub mod server;
pub mod service;
pub mod store;
pub mod summary;

use crate::core::aggregate::RandomMultiplier;
use crate::core::config::AppConfig;
use crate::core::country::ListQuery;
use crate::providers::{OpenErApiProvider, RateCache, RestCountriesProvider};
use crate::refresh::RefreshPipeline;
use crate::server::AppState;
use crate::service::{CountryService, memory_listing_cache};
use crate::store::DiskCountryStore;
use crate::summary::{SummaryArtifact, SvgRenderer};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Refresh,
    List(ListQuery),
    Show(String),
    Delete(String),
    Status,
}

/// Wires the configured sources, store, caches and renderer together.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let data_path = config.data_path()?;
    let store = Arc::new(
        DiskCountryStore::open(&data_path.join("db"))
            .with_context(|| format!("Failed to open country store in {}", data_path.display()))?,
    );
    let artifact = SummaryArtifact::new(config.summary_path()?);

    let service = CountryService::new(
        store.clone(),
        memory_listing_cache(),
        config.cache_ttl(),
        artifact.clone(),
    );

    let countries = Arc::new(RestCountriesProvider::new(
        &config.providers.countries.base_url,
        config.fetch_timeout(),
    ));
    let rates = Arc::new(RateCache::new(Arc::new(OpenErApiProvider::new(
        &config.providers.rates.base_url,
        config.fetch_timeout(),
    ))));
    let renderer = Arc::new(SvgRenderer::new(
        config.summary.font_path.as_ref().map(PathBuf::from),
    ));

    let refresh = RefreshPipeline::new(
        countries,
        rates,
        store,
        service.clone(),
        renderer,
        artifact,
        Arc::new(RandomMultiplier),
    );
    Ok(AppState { service, refresh })
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let state = build_state(&config)?;
    match command {
        AppCommand::Serve => {
            info!("Country GDP service starting...");
            server::serve(Arc::new(state), config.server.socket_addr()?).await
        }
        AppCommand::Refresh => cli::refresh::run(&state.refresh).await,
        AppCommand::List(query) => cli::countries::list(&state.service, &query).await,
        AppCommand::Show(name) => cli::countries::show(&state.service, &name).await,
        AppCommand::Delete(name) => cli::countries::delete(&state.service, &name).await,
        AppCommand::Status => cli::status::run(&state.service).await,
    }
}
