// Path: crates/cli/src/util.rs

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use oraclegate_api::abi::{AbiType, AbiValue};
use oraclegate_api::query::{derive_identifier, query_id, QueryParameters, QueryPayload};
use oraclegate_api::time::{Clock, SystemClock};
use oraclegate_storage::{open_stores, Stores};
use oraclegate_types::app::{QueryId, Timestamp};
use oraclegate_types::config::OracleConfig;
use std::path::Path;
use std::sync::Arc;

/// Splits a `type:value` argument, e.g. `uint256:7` or `address:0xab..`.
pub fn parse_typed(raw: &str, index: usize) -> Result<(AbiType, AbiValue)> {
    let (ty, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("expected type:value, got {raw:?}"))?;
    let ty: AbiType = ty.parse()?;
    let value = AbiValue::parse(ty, value, index)?;
    Ok((ty, value))
}

pub fn parse_fields(raw: &[String]) -> Result<(Vec<AbiType>, Vec<AbiValue>)> {
    let mut types = Vec::with_capacity(raw.len());
    let mut values = Vec::with_capacity(raw.len());
    for (i, r) in raw.iter().enumerate() {
        let (ty, value) = parse_typed(r, i).with_context(|| format!("field {i}"))?;
        types.push(ty);
        values.push(value);
    }
    Ok((types, values))
}

pub fn parse_hex(raw: &str) -> Result<Vec<u8>> {
    hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).context("invalid hex")
}

pub fn hex0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn now_or_system(now: Option<Timestamp>) -> Timestamp {
    now.unwrap_or_else(|| SystemClock.now())
}

/// Selects a query either by identifier, by raw payload, or by kind and parameters.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Query identifier (32-byte hex).
    #[clap(long)]
    pub id: Option<QueryId>,
    /// Raw query payload (hex). The identifier defaults to its hash.
    #[clap(long, conflicts_with = "kind")]
    pub payload: Option<String>,
    /// Query kind tag, e.g. `albumDrop`.
    #[clap(long)]
    pub kind: Option<String>,
    /// Query parameter as `type:value`, repeatable, in tuple order.
    #[clap(long = "param")]
    pub params: Vec<String>,
}

impl TargetArgs {
    /// The identifier, plus the payload when it is known.
    pub fn resolve(&self) -> Result<(Option<QueryPayload>, QueryId)> {
        if let Some(raw) = &self.payload {
            let payload = QueryPayload::from_bytes(parse_hex(raw)?);
            let id = self.id.unwrap_or_else(|| derive_identifier(&payload));
            return Ok((Some(payload), id));
        }
        if let Some(kind) = &self.kind {
            let (shape, values) = parse_fields(&self.params)?;
            let (payload, derived) = query_id(kind, &QueryParameters::new(shape, values))?;
            if let Some(id) = self.id {
                if id != derived {
                    bail!("--id {id} does not match the identifier {derived} of the given query");
                }
            }
            return Ok((Some(payload), derived));
        }
        match self.id {
            Some(id) => Ok((None, id)),
            None => bail!("select a query with --id, --payload or --kind/--param"),
        }
    }

    pub fn identifier(&self) -> Result<QueryId> {
        Ok(self.resolve()?.1)
    }
}

/// Configuration and opened stores for commands that touch storage.
pub struct Env {
    pub cfg: OracleConfig,
    pub stores: Stores,
}

pub fn open_env(config: &Path) -> Result<Env> {
    let cfg = OracleConfig::load(config)
        .with_context(|| format!("failed to load config from {}", config.display()))?;
    let stores = open_stores(&cfg.storage, Arc::new(SystemClock))
        .context("failed to open the value store")?;
    Ok(Env { cfg, stores })
}
