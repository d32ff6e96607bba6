//! triage-cli: operator tool for the post-call triage engine
//!
//! # Subcommands
//! - `evaluate <file> [--config <toml>] [--call-id <uuid>] [--json]`: run the
//!   scoring/escalation pipeline locally on a captured slot file
//! - `submit <file> [--call-id <uuid>] [--json]`: send the call to a running server
//! - `status`: show server health
//!
//! A slot file is either a bare JSON object of slots or
//! `{"call_id": "...", "slots": {...}}`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use triage_core::{Evaluation, SlotSet, TriageConfig, TriageEngine};
use uuid::Uuid;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5055";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "triage-cli", version, about = "Evaluate and submit post-call triage results")]
struct Cli {
    /// Triage HTTP server URL (overrides TRIAGE_HTTP_URL env var)
    #[arg(long, env = "TRIAGE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Score a captured call locally, without saving it
    Evaluate {
        /// JSON slot file
        file: PathBuf,

        /// Engine configuration (defaults apply when the file is missing)
        #[arg(short, long, default_value = "triage.toml")]
        config: String,

        /// Call id stamped on the record
        #[arg(long)]
        call_id: Option<Uuid>,

        /// Print the call record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send a captured call to the server for scoring and storage
    Submit {
        /// JSON slot file
        file: PathBuf,

        /// Call id stamped on the record
        #[arg(long)]
        call_id: Option<Uuid>,

        /// Print the raw server response
        #[arg(long)]
        json: bool,
    },

    /// Show triage server status
    Status,
}

// ============================================================================
// Slot files
// ============================================================================

#[derive(Debug, Deserialize)]
struct WrappedCall {
    call_id: Option<Uuid>,
    slots: SlotSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallFile {
    pub call_id: Option<Uuid>,
    pub slots: SlotSet,
}

/// Parse either `{"call_id":..,"slots":{..}}` or a bare slot object.
pub fn parse_call_file(contents: &str) -> anyhow::Result<CallFile> {
    let value: serde_json::Value = serde_json::from_str(contents).context("slot file is not JSON")?;

    if value.get("slots").is_some_and(serde_json::Value::is_object) {
        let wrapped: WrappedCall = serde_json::from_value(value).context("invalid call file")?;
        return Ok(CallFile {
            call_id: wrapped.call_id,
            slots: wrapped.slots,
        });
    }

    let slots: SlotSet = serde_json::from_value(value).context("invalid slot object")?;
    Ok(CallFile {
        call_id: None,
        slots,
    })
}

fn read_call_file(path: &Path, call_id: Option<Uuid>) -> anyhow::Result<CallFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut call = parse_call_file(&contents)?;
    if call_id.is_some() {
        call.call_id = call_id;
    }
    Ok(call)
}

/// Human-readable report of a local evaluation.
pub fn format_summary(evaluation: &Evaluation) -> String {
    let score = &evaluation.score;
    let b = &score.breakdown;
    let mut out = String::new();

    out.push_str(&format!("Score:      {}/100 ({})\n", score.final_score, score.category));
    out.push_str(&format!(
        "Penalties:  pain {} · medication {} · transit {} · mood {} · fever {} · keyword {}\n",
        b.pain, b.medication, b.transit, b.mood, b.fever, b.keyword
    ));
    if evaluation.emergency.detected {
        out.push_str(&format!("Emergency:  YES ({})\n", evaluation.emergency.summary()));
    } else {
        out.push_str("Emergency:  no\n");
    }
    out.push('\n');
    for utterance in evaluation.utterances() {
        out.push_str(&format!("> {}\n", utterance));
    }
    out
}

// ============================================================================
// Commands
// ============================================================================

fn do_evaluate(file: &Path, config: &str, call_id: Option<Uuid>, json: bool) -> anyhow::Result<()> {
    let config = TriageConfig::load_validated(config)?;
    let call = read_call_file(file, call_id)?;

    let engine = TriageEngine::new(config);
    let evaluation = engine.evaluate(&call.slots, call.call_id);

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation.record)?);
    } else {
        print!("{}", format_summary(&evaluation));
    }
    Ok(())
}

/// Send the call to POST /calls.
fn do_submit(server: &str, file: &Path, call_id: Option<Uuid>, json: bool) -> anyhow::Result<()> {
    let call = read_call_file(file, call_id)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let url = format!("{}/calls", server);
    let body = serde_json::json!({
        "call_id": call.call_id,
        "slots": call.slots,
    });

    let resp = match client.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("triage-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("triage-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    let result: serde_json::Value = resp.json().context("failed to parse server response")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let record = &result["record"];
    println!("Call:       {}", record["call_id"].as_str().unwrap_or("?"));
    println!(
        "Score:      {}/100 ({})",
        record["medical_score"],
        record["score_category"].as_str().unwrap_or("?")
    );
    println!("Emergency:  {}", record["emergency_detected"]);
    println!(
        "Saved:      {}",
        result["save_outcome"]["state"].as_str().unwrap_or("?")
    );
    if let Some(utterances) = result["utterances"].as_array() {
        println!();
        for u in utterances {
            println!("> {}", u.as_str().unwrap_or_default());
        }
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);

    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Triage server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Record sink:   {}", body["sink"].as_str().unwrap_or("?"));
            println!("Vocabulary:    {}", body["vocabulary"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("triage-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("triage-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Evaluate {
            file,
            config,
            call_id,
            json,
        } => do_evaluate(&file, &config, call_id, json),
        Commands::Submit {
            file,
            call_id,
            json,
        } => do_submit(&server, &file, call_id, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("triage-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
