//! Simulation parameter commands.

use clap::Subcommand;
use lifedash_core::ParameterUpdate;
use serde::Serialize;

use super::{log_events, open_engine, CliResult};

#[derive(Subcommand)]
pub enum ParamsAction {
    /// Show the current parameters and balance
    Get,
    /// Change one or more parameters
    Set {
        /// Monthly expense, drained continuously (30-day month)
        #[arg(long)]
        monthly_expense: Option<String>,
        /// Length of the daily work window in hours (0-24)
        #[arg(long)]
        work_hours: Option<String>,
        /// Local time the work window opens, HH:MM
        #[arg(long)]
        reset_time: Option<String>,
        /// Overwrite the current balance
        #[arg(long)]
        balance: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParamsView {
    monthly_expense: f64,
    work_hours: f64,
    reset_time: String,
    balance: f64,
}

pub fn run(action: ParamsAction) -> CliResult {
    match action {
        ParamsAction::Get => {
            let mut engine = open_engine()?;
            log_events(&mut engine);
            print_params(&engine.params(), engine.state().balance)?;
        }
        ParamsAction::Set {
            monthly_expense,
            work_hours,
            reset_time,
            balance,
        } => {
            let update = ParameterUpdate::from_raw(
                monthly_expense.as_deref(),
                work_hours.as_deref(),
                reset_time.as_deref(),
                balance.as_deref(),
            )?;
            if update.is_empty() {
                return Err("nothing to set; pass at least one option".into());
            }
            let mut engine = open_engine()?;
            engine.set_parameters(update)?;
            log_events(&mut engine);
            print_params(&engine.params(), engine.state().balance)?;
        }
    }
    Ok(())
}

fn print_params(params: &lifedash_core::Parameters, balance: f64) -> CliResult {
    let view = ParamsView {
        monthly_expense: params.monthly_expense,
        work_hours: params.work_hours,
        reset_time: params.reset_time.to_string(),
        balance,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
