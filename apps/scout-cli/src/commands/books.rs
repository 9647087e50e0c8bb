//! Pricing, scanning and purchase-cost commands.

use anyhow::Result;
use scout_core::money::Money;
use scout_core::types::{BookMetadata, NewScan};
use scout_core::validation::normalize_isbn;
use scout_sync::{ScanOutcome, ScoutEngine};
use serde_json::json;

use super::print_json;
use crate::cli::BookArgs;

fn metadata(args: &BookArgs) -> BookMetadata {
    let text = |value: &str| (!value.trim().is_empty()).then(|| value.trim().to_string());
    BookMetadata {
        title: text(&args.title),
        author: text(&args.author),
        publisher: args.publisher.as_deref().and_then(text),
    }
}

pub async fn price(engine: &ScoutEngine, args: BookArgs) -> Result<()> {
    let isbn = normalize_isbn(&args.isbn)?;
    let quote = engine.resolver.resolve(&isbn, &metadata(&args)).await;
    print_json(&quote)
}

pub async fn scan(engine: &ScoutEngine, args: BookArgs) -> Result<()> {
    let scan = NewScan {
        isbn: args.isbn,
        title: args.title,
        author: args.author,
    };
    let outcome = engine.recorder.record(&scan).await?;

    let queued_id = match &outcome {
        ScanOutcome::Queued { queued, .. } => Some(queued.id.clone()),
        ScanOutcome::Committed { .. } => None,
    };
    print_json(&json!({
        "committed": !outcome.is_queued(),
        "queuedId": queued_id,
        "record": outcome.record(),
        "quote": outcome.quote(),
    }))
}

pub async fn cost(engine: &ScoutEngine, isbn: &str, amount: f64) -> Result<()> {
    let cost = Money::from_wire_amount("cost", amount)?;
    let record = engine.recorder.set_cost(isbn, cost).await?;
    print_json(&record)
}

pub async fn list(engine: &ScoutEngine, limit: u32) -> Result<()> {
    let books = engine.db.books().list_by_recency(Some(limit)).await?;
    print_json(&books)
}
