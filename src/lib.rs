pub mod app;
pub mod config;
pub mod directory;
pub mod lookup;
pub mod query;
pub mod resolver;

use anyhow::Result;
use log::*;

pub async fn run() -> Result<()> {
    // Create and run the application
    let app = app::Application::new()?;
    info!("Initializing nameplate application");
    app.run().await
}

pub fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

// Re-export commonly used types
pub use config::Config;
pub use directory::{DirectoryContact, DirectorySource};
pub use lookup::{resolve_display_name, resolve_with_timeout};
pub use query::{Candidate, ContactQuery, ContactSource, QueryListener};
pub use resolver::AddressResolver;
