pub mod completions;
pub mod config;
pub mod params;
pub mod run;
pub mod status;
pub mod task;

use lifedash_core::{Config, Database, Event, LifeEngine, SystemClock};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the configured store and start an engine on the system clock.
///
/// Starting reconciles offline time, so every command sees a current state.
pub fn open_engine() -> Result<LifeEngine<Database>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = lifedash_core::open_database(&config)?;
    Ok(LifeEngine::start(db, SystemClock))
}

/// Events from one-shot commands go to the log.
pub fn log_events(engine: &mut LifeEngine<Database>) {
    for event in engine.drain_events() {
        log_event(&event);
    }
}

fn log_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => log::info!("{line}"),
        Err(e) => log::warn!("unprintable event: {e}"),
    }
}
