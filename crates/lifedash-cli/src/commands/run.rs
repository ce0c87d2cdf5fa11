//! Foreground tick loop.
//!
//! Events are printed to stdout as JSON lines; the loop stops on Ctrl-C or
//! after `--ticks`.

use lifedash_core::driver::{self, RunOptions};
use lifedash_core::{Config, LifeEngine, SystemClock};
use tokio::sync::watch;

use super::CliResult;

pub fn run(ticks: Option<u64>) -> CliResult {
    let config = Config::load()?;
    let db = lifedash_core::open_database(&config)?;
    let options = RunOptions {
        period: config.tick_interval(),
        max_ticks: ticks,
        snapshot_every_tick: config.driver.snapshot_every_tick,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let engine = runtime.block_on(async move {
        let engine = LifeEngine::start(db, SystemClock);
        // Held for the lifetime of the loop; dropping it would close the channel.
        let (_handle, commands) = driver::channel(16);
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("interrupt received, stopping");
                let _ = stop_tx.send(true);
            }
        });

        driver::run(engine, options, commands, stop_rx, |events| {
            for event in events {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => log::warn!("unprintable event: {e}"),
                }
            }
        })
        .await
    });

    let state = engine.state();
    eprintln!(
        "stopped after {} ticks: balance {:.2}, level {}",
        engine.tick_count(),
        state.balance,
        state.level.value()
    );
    Ok(())
}
