// Path: crates/cli/src/commands/evaluate.rs

use crate::util::{hex0x, now_or_system, open_env, parse_fields};
use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use oraclegate_services::consumer::{
    ActionReport, ConditionOutcome, ConditionRegistry, ConditionalConsumer,
};
use oraclegate_services::crowdfund::{album_drop_condition, EscrowRelease, FundRelease};
use oraclegate_types::app::{Address, QueryId, Timestamp};
use oraclegate_types::config::OracleConfig;
use oraclegate_types::error::ActionError;
use oraclegate_types::keys::ALBUM_DROP_KIND;
use serde_json::json;
use std::path::Path;
use std::sync::Mutex;

#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Registered condition kind.
    #[clap(long, default_value = ALBUM_DROP_KIND)]
    pub kind: String,
    /// Query parameter as `type:value`, repeatable, in tuple order.
    #[clap(long = "param")]
    pub params: Vec<String>,
    /// Evaluate as of this UNIX time instead of now.
    #[clap(long)]
    pub now: Option<Timestamp>,
    /// Run the release action once if the condition is satisfied.
    #[clap(long)]
    pub act: bool,
}

/// Stands in for the escrow contract: records the release so it can be printed.
#[derive(Default)]
struct PrintingEscrow {
    released_to: Mutex<Option<Address>>,
}

#[async_trait]
impl EscrowRelease for PrintingEscrow {
    async fn release(&self, identifier: &QueryId, beneficiary: Address) -> Result<(), ActionError> {
        tracing::info!(identifier = %identifier, beneficiary = %beneficiary, "releasing escrow");
        *self
            .released_to
            .lock()
            .map_err(|_| ActionError::Failed("escrow state poisoned".into()))? = Some(beneficiary);
        Ok(())
    }
}

pub fn registry(cfg: &OracleConfig) -> ConditionRegistry {
    let mut registry = ConditionRegistry::new();
    registry.register(album_drop_condition(cfg.retrieval.max_age()));
    registry.apply_config(cfg);
    registry
}

pub async fn run(args: EvaluateArgs, config: &Path) -> Result<()> {
    let env = open_env(config)?;
    let consumer = ConditionalConsumer::new(
        registry(&env.cfg),
        env.stores.values,
        env.stores.markers,
        env.cfg.retrieval.io_timeout(),
    );
    let (_, values) = parse_fields(&args.params)?;
    let now = now_or_system(args.now);

    let out = if args.act {
        let action = FundRelease::new(PrintingEscrow::default());
        let (_, id) = consumer.identifier_for(&args.kind, &values)?;
        let report = consumer.act_once(&args.kind, &values, now, &action).await?;
        let released_to = action
            .escrow()
            .released_to
            .lock()
            .ok()
            .and_then(|g| *g)
            .map(|a| a.to_string());
        let (status, at, error) = match &report {
            ActionReport::Pending => ("pending", None, None),
            ActionReport::Indeterminate(e) => ("indeterminate", None, Some(e.to_string())),
            ActionReport::Executed { at } => ("executed", Some(*at), None),
            ActionReport::AlreadyActed { at } => ("already_acted", Some(*at), None),
        };
        json!({
            "identifier": id.to_string(),
            "kind": args.kind,
            "action": status,
            "acted_at": at,
            "released_to": released_to,
            "error": error,
        })
    } else {
        let eval = consumer.evaluate_condition(&args.kind, &values, now).await?;
        let (fields, error) = match &eval.outcome {
            ConditionOutcome::Satisfied(v) => (
                Some(v.fields().iter().map(|f| f.to_string()).collect::<Vec<_>>()),
                None,
            ),
            ConditionOutcome::Indeterminate(e) => (None, Some(e.to_string())),
            ConditionOutcome::Unsatisfied => (None, None),
        };
        json!({
            "identifier": eval.identifier.to_string(),
            "kind": args.kind,
            "outcome": eval.outcome.label(),
            "fields": fields,
            "error": error,
            "value": eval.retrieved.as_ref().map(|r| hex0x(&r.value)),
            "reporter": eval.retrieved.as_ref().map(|r| r.reporter.to_string()),
            "submitted_at": eval.retrieved.as_ref().map(|r| r.submitted_at),
        })
    };
    println!("{out}");
    Ok(())
}
