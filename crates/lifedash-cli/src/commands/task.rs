//! Task management commands for CLI.

use clap::Subcommand;
use lifedash_core::format::RemainingLabel;
use lifedash_core::TaskId;

use super::{log_events, open_engine, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task with a deadline
    Add {
        /// Task name
        name: String,
        /// Deadline, RFC 3339 or local "YYYY-MM-DDTHH:MM"
        deadline: String,
    },
    /// List tasks
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Complete a task and gain a level
    Complete {
        /// Task ID
        id: TaskId,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        TaskAction::Add { name, deadline } => {
            let task = engine.add_task(&name, &deadline)?;
            println!("Task added: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { json } => {
            let tasks = engine.snapshot().tasks;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                for view in &tasks {
                    println!(
                        "{:<15} {:>8}  {}  {}",
                        view.task.id,
                        view.label.to_string(),
                        view.task.deadline.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                        view.task.name
                    );
                }
            }
        }
        TaskAction::Complete { id } => match engine.complete_task(id)? {
            Some(task) => {
                println!("Task completed: {} ({})", task.id, task.name);
                println!("Level: {}", engine.state().level.value());
            }
            None => return Err(format!("task not found: {id}").into()),
        },
        TaskAction::Delete { id } => match engine.delete_task(id)? {
            Some(task) => {
                let note = if task.is_expired() {
                    format!(" [{}]", RemainingLabel::Expired)
                } else {
                    String::new()
                };
                println!("Task deleted: {}{note}", task.id);
            }
            None => return Err(format!("task not found: {id}").into()),
        },
    }

    log_events(&mut engine);
    Ok(())
}
