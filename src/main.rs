mod api;
mod app;
mod config;
mod upload;
mod utils;

use app::DocVaultApp;
use config::AppConfig;
use eframe::CreationContext;
use tracing::{error, warn};
use upload::UploadStrategy;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let UploadStrategy::Direct { bucket_base } = &config.strategy {
        warn!(
            "Direct uploads to {} have no per-user namespace; files with the same name overwrite each other",
            bucket_base
        );
    }

    let client = match config.http_client() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([720.0, 680.0])
            .with_min_inner_size([480.0, 520.0]),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "DocVault",
        options,
        Box::new(move |cc: &CreationContext| Box::new(DocVaultApp::new(cc, config, client))),
    ) {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}
