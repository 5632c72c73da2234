// Path: crates/cli/src/commands/query.rs

use crate::util::{hex0x, now_or_system, open_env, TargetArgs};
use anyhow::Result;
use clap::{Parser, Subcommand};
use oraclegate_services::reporting::ReportingGateway;
use oraclegate_services::retrieval::Retrieval;
use oraclegate_types::app::{Submission, Timestamp};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

#[derive(Parser, Debug)]
pub struct QueryArgs {
    #[clap(subcommand)]
    pub command: QueryCommands,
}

#[derive(Subcommand, Debug)]
pub enum QueryCommands {
    /// Print the payload and identifier of a query. Needs no store.
    Id(TargetArgs),
    /// The newest non-disputed value, whatever its age.
    Current(TargetArgs),
    /// The newest value passing the dispute and staleness rules.
    Latest {
        #[clap(flatten)]
        target: TargetArgs,
        /// Evaluate as of this UNIX time instead of now.
        #[clap(long)]
        now: Option<Timestamp>,
        /// Override the configured staleness bound.
        #[clap(long)]
        max_age_secs: Option<u64>,
    },
    /// The newest non-disputed value strictly before a time.
    Before {
        #[clap(flatten)]
        target: TargetArgs,
        #[clap(long)]
        timestamp: Timestamp,
    },
    /// Exact lookup by nonce, disputed records included.
    Specific {
        #[clap(flatten)]
        target: TargetArgs,
        #[clap(long)]
        nonce: u64,
    },
    /// Every submission in listing order.
    History(TargetArgs),
    /// The query kind and parameters recorded for an identifier.
    Data(TargetArgs),
}

pub fn submission_json(s: &Submission) -> Value {
    json!({
        "identifier": s.identifier.to_string(),
        "value": hex0x(&s.value),
        "submitted_at": s.submitted_at,
        "reporter": s.reporter.to_string(),
        "nonce": s.nonce,
        "sequence": s.sequence,
        "disputed": s.disputed,
    })
}

pub async fn run(args: QueryArgs, config: &Path) -> Result<()> {
    let out = match args.command {
        QueryCommands::Id(target) => {
            let (payload, id) = target.resolve()?;
            json!({
                "identifier": id.to_string(),
                "payload": payload.map(|p| hex0x(p.as_bytes())),
            })
        }
        QueryCommands::Current(target) => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            let cv = Retrieval::new(env.stores.values).get_current_value(&id)?;
            json!({
                "identifier": id.to_string(),
                "found": cv.found,
                "value": hex0x(&cv.value),
                "submitted_at": cv.submitted_at,
            })
        }
        QueryCommands::Latest {
            target,
            now,
            max_age_secs,
        } => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            let now = now_or_system(now);
            let max_age = max_age_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| env.cfg.retrieval.max_age());
            let latest = Retrieval::new(env.stores.values)
                .fetch_latest_valid(&id, now, max_age, env.cfg.retrieval.io_timeout())
                .await?;
            json!({
                "identifier": id.to_string(),
                "now": now,
                "max_age_secs": max_age.as_secs(),
                "found": latest.is_some(),
                "value": latest.as_ref().map(|r| hex0x(&r.value)),
                "submitted_at": latest.as_ref().map(|r| r.submitted_at),
                "reporter": latest.as_ref().map(|r| r.reporter.to_string()),
            })
        }
        QueryCommands::Before { target, timestamp } => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            let before = Retrieval::new(env.stores.values).get_data_before(&id, timestamp)?;
            json!({
                "identifier": id.to_string(),
                "found": before.is_some(),
                "value": before.as_ref().map(|r| hex0x(&r.value)),
                "submitted_at": before.as_ref().map(|r| r.submitted_at),
            })
        }
        QueryCommands::Specific { target, nonce } => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            match Retrieval::new(env.stores.values).get_specific(&id, nonce)? {
                Some(s) => submission_json(&s),
                None => json!({ "identifier": id.to_string(), "found": false }),
            }
        }
        QueryCommands::History(target) => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            let snap = Retrieval::new(env.stores.values).history(&id)?;
            json!({
                "identifier": id.to_string(),
                "count": snap.len(),
                "submissions": snap.iter().map(submission_json).collect::<Vec<_>>(),
            })
        }
        QueryCommands::Data(target) => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            let data = ReportingGateway::new(env.stores.values).query_data(&id)?;
            json!({
                "identifier": id.to_string(),
                "found": data.is_some(),
                "kind": data.as_ref().map(|d| d.kind.clone()),
                "params": data.as_ref().map(|d| hex0x(&d.params)),
            })
        }
    };
    println!("{out}");
    Ok(())
}
