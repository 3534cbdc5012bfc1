//! Binary entry point: resolve configuration, start file logging, open the
//! SQLite store and hand control to the terminal UI.
use pantry_manager::{db, init_logging, run_app, App, Config};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config)?;
    info!(db_path = %config.db_path.display(), "starting pantry manager");

    let conn = db::open(&config.db_path)?;
    let mut app = App::new(conn)?;
    run_app(&mut app)
}
