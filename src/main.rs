use std::sync::Mutex;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use chemlab::service::{ChemistryService, HttpTransport};
use chemlab::web::{configure, Workspace};
use chemlab::*;
use tracing::*;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(&config.log_level);

    let workspace = web::Data::new(Mutex::new(Workspace::new(config.language)));
    let bind = config.bind.clone();
    info!(
        "Serving on http://{} (model {} at {})",
        bind, config.model, config.base_url
    );

    HttpServer::new(move || {
        // The HTTP client is bound to its worker, so each worker gets its own service.
        let service = ChemistryService::new(HttpTransport::new(&config));
        App::new()
            .app_data(workspace.clone())
            .app_data(web::Data::new(service))
            .configure(configure)
    })
    .bind(&bind)
    .with_context(|| format!("Failed to bind {bind}"))?
    .run()
    .await
    .context("Server error")
}
