use devlens::output::{recover_json, Candidate};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::output::print_json;

#[derive(Debug, Serialize)]
struct Extraction {
    source: String,
    repairs: Vec<&'static str>,
    value: Value,
}

fn extract(raw: &str) -> anyhow::Result<Extraction> {
    let (candidate, value): (Candidate, Value) = recover_json(raw)?;
    Ok(Extraction {
        source: format!("{:?}", candidate.source()),
        repairs: candidate.repairs().iter().map(|fix| fix.as_str()).collect(),
        value,
    })
}

pub fn run(file: &Path, json: bool) -> anyhow::Result<()> {
    let raw = super::read_input(file)?;
    let extraction = extract(&raw)?;
    tracing::debug!(
        source = %extraction.source,
        repairs = ?extraction.repairs,
        "Recovered JSON"
    );

    if json {
        print_json(&extraction)
    } else {
        if !extraction.repairs.is_empty() {
            eprintln!("repaired: {}", extraction.repairs.join(", "));
        }
        print_json(&extraction.value)
    }
}
