//! Catalog watcher - observes one query and logs every update until Ctrl-C.

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_sync::application::{ObservedView, SyncError, SyncService};
use catalog_sync::config::{ConfigError, LogFormat, LoggingConfig, SyncConfig};
use catalog_sync::domain::catalog::{CatalogQuery, CollectionFilter, Resource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResourceArg {
    Courses,
    Paths,
    Schedules,
    Availability,
}

impl From<ResourceArg> for Resource {
    fn from(arg: ResourceArg) -> Self {
        match arg {
            ResourceArg::Courses => Resource::Courses,
            ResourceArg::Paths => Resource::Paths,
            ResourceArg::Schedules => Resource::Schedules,
            ResourceArg::Availability => Resource::Availability,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "catalog-sync")]
#[command(about = "Watch a live catalog query", long_about = None)]
struct Args {
    /// Resource to query
    #[arg(long, value_enum, default_value = "courses")]
    resource: ResourceArg,

    /// Entity id (takes precedence over slug and code)
    #[arg(long)]
    id: Option<String>,

    /// Entity slug
    #[arg(long)]
    slug: Option<String>,

    /// Entity code
    #[arg(long)]
    code: Option<String>,

    /// Collection category filter
    #[arg(long)]
    category: Option<String>,

    /// Collection type filter
    #[arg(long = "type")]
    kind: Option<String>,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    offset: Option<u32>,
}

impl Args {
    fn query(&self) -> CatalogQuery {
        let filter = CollectionFilter {
            category: self.category.clone(),
            kind: self.kind.clone(),
            limit: self.limit,
            offset: self.offset,
        };
        CatalogQuery::from_parts(
            self.resource.into(),
            self.id.as_deref(),
            self.slug.as_deref(),
            self.code.as_deref(),
            filter,
        )
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn log_view(view: &ObservedView) {
    tracing::info!(
        entities = view.snapshot.len(),
        freshness = ?view.freshness,
        error = view.error.as_ref().map(|e| e.to_string()),
        "View updated"
    );
    for entity in &view.snapshot.entities {
        let selected = entity.selected_edition();
        tracing::info!(
            id = %entity.id(),
            slug = entity.entity.slug.as_deref().unwrap_or("-"),
            editions = entity.editions.len(),
            selected = selected.map(|e| e.id.to_string()),
            seats_available = selected.and_then(|e| e.seats_available),
            sold_out = selected.map(|e| e.is_sold_out()),
            "  entity"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    let args = Args::parse();

    let config = SyncConfig::load()?;
    config.validate().map_err(ConfigError::from)?;
    init_tracing(&config.logging);

    let service = SyncService::new(&config)?;
    let query = args.query();
    tracing::info!(?query, base_url = config.endpoint.base_url(), "Watching catalog query");

    let mut observation = service.observe(query);
    let mut connection = service.watch_connection();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connection.borrow_and_update();
                tracing::info!(%state, "Channel state changed");
            }
            view = observation.changed() => match view {
                Ok(view) => log_view(&view),
                Err(_) => break,
            },
        }
    }

    observation.stop();
    service.shutdown().await;
    tracing::info!("Watcher stopped");
    Ok(())
}
