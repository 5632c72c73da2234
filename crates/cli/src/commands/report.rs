// Path: crates/cli/src/commands/report.rs

use crate::commands::query::submission_json;
use crate::util::{hex0x, open_env, parse_fields, parse_hex, TargetArgs};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use oraclegate_api::abi;
use oraclegate_services::reporting::ReportingGateway;
use oraclegate_types::app::Address;
use std::path::Path;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    #[clap(subcommand)]
    pub command: ReportCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Submit a value on behalf of a reporter.
    Submit {
        #[clap(flatten)]
        target: TargetArgs,
        #[clap(long)]
        reporter: Address,
        #[clap(long)]
        nonce: u64,
        /// Raw value bytes (hex).
        #[clap(long, conflicts_with = "field", required_unless_present = "field")]
        value: Option<String>,
        /// Value field as `type:value`, repeatable, in tuple order.
        #[clap(long)]
        field: Vec<String>,
    },
    /// Flag a submission as disputed.
    Dispute {
        #[clap(flatten)]
        target: TargetArgs,
        #[clap(long)]
        nonce: u64,
        /// Dispute this reporter's submission instead of the earliest with the nonce.
        #[clap(long)]
        reporter: Option<Address>,
    },
    /// Encode a value tuple and print it as hex. Needs no store.
    EncodeValue {
        /// Value field as `type:value`, repeatable, in tuple order.
        #[clap(long, required = true)]
        field: Vec<String>,
    },
}

fn encode_fields(raw: &[String]) -> Result<Vec<u8>> {
    let (shape, values) = parse_fields(raw)?;
    Ok(abi::encode(&shape, &values)?)
}

pub fn run(args: ReportArgs, config: &Path) -> Result<()> {
    let out = match args.command {
        ReportCommands::Submit {
            target,
            reporter,
            nonce,
            value,
            field,
        } => {
            let (payload, id) = target.resolve()?;
            let Some(payload) = payload else {
                bail!("submitting needs the query itself: pass --payload or --kind/--param");
            };
            let value = match value {
                Some(raw) => parse_hex(&raw)?,
                None => encode_fields(&field)?,
            };
            let env = open_env(config)?;
            let gateway = ReportingGateway::new(env.stores.values);
            let s = gateway.submit_value(reporter, id, value, nonce, payload.as_bytes())?;
            submission_json(&s)
        }
        ReportCommands::Dispute {
            target,
            nonce,
            reporter,
        } => {
            let id = target.identifier()?;
            let env = open_env(config)?;
            let gateway = ReportingGateway::new(env.stores.values);
            let s = match reporter {
                Some(r) => gateway.begin_dispute_for(&id, &r, nonce)?,
                None => gateway.begin_dispute(&id, nonce)?,
            };
            submission_json(&s)
        }
        ReportCommands::EncodeValue { field } => {
            serde_json::json!({ "value": hex0x(&encode_fields(&field)?) })
        }
    };
    println!("{out}");
    Ok(())
}
