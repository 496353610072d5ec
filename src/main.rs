use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use drawmgr::cli::commands::Cli;
use drawmgr::cli::handlers;
use drawmgr::io::{config_io, logging, state};
use drawmgr::model::PermissionSet;
use drawmgr::ops::auth::hash_password;
use drawmgr::store::{MemoryStore, Store};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = config_io::read_config(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    if let Err(e) = logging::init_logging(&config.log) {
        eprintln!("warning: logging disabled: {}", e);
    }

    if let Some(command) = cli.command {
        return handlers::dispatch(command, &config);
    }

    if cli.demo {
        // No UI state is remembered for the throwaway store
        let demo = Arc::new(MemoryStore::demo());
        demo.add_user(
            "admin",
            &hash_password("admin", config.auth.pbkdf2_iterations),
            PermissionSet::all(),
        )?;
        tracing::info!("starting with demo data");
        return drawmgr::tui::run(Store::memory(demo), config, None);
    }

    let store = Store::open_sqlite(&config.database.path)?;
    let state_path = state::state_path(&config.database.path);
    drawmgr::tui::run(store, config, Some(state_path))
}
