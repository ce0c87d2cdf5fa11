use super::{log_events, open_engine, CliResult};

pub fn run() -> CliResult {
    let mut engine = open_engine()?;
    log_events(&mut engine);
    println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
    Ok(())
}
