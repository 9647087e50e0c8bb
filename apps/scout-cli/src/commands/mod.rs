//! # Commands
//!
//! One module per command group. Every command prints JSON to stdout so the
//! output can be piped; logs go to stderr.

pub mod books;
pub mod config;
pub mod queue;
pub mod storage;
pub mod sync;

use anyhow::Result;
use scout_sync::{ScoutConfig, ScoutEngine};
use serde::Serialize;

use crate::cli::Command;

/// Routes a parsed command to its handler.
pub async fn dispatch(command: Command, engine: &ScoutEngine, config: &ScoutConfig) -> Result<()> {
    match command {
        Command::Price(args) => books::price(engine, args).await,
        Command::Scan(args) => books::scan(engine, args).await,
        Command::Cost { isbn, amount } => books::cost(engine, &isbn, amount).await,
        Command::Books { limit } => books::list(engine, limit).await,
        Command::Queue(command) => queue::run(engine, command).await,
        Command::Sync => sync::force(engine).await,
        Command::Status => sync::status(engine).await,
        Command::Agent => sync::agent(engine, config).await,
        Command::Stats => storage::stats(engine).await,
        Command::Sweep => storage::sweep(engine).await,
        Command::Clear => storage::clear(engine).await,
        Command::Config(command) => config::run(&command, None),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
