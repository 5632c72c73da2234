// Path: crates/services/src/crowdfund/mod.rs
//! The crowdfund "albumDrop" condition.
//!
//! Contributors fund an album through a crowdfund contract. Escrowed funds go to
//! the beneficiary once the reporting network confirms the album was released.

use crate::consumer::{ConditionSpec, ReleaseAction};
use async_trait::async_trait;
use oraclegate_api::abi::{AbiType, AbiValue};
use oraclegate_api::query::{
    encode_value, query_id, DecodedValue, QueryParameters, QueryPayload, ValueShape,
};
use oraclegate_types::app::{Address, QueryId, RetrievedValue, U256};
use oraclegate_types::error::{ActionError, DecodeError, EncodingError};
use oraclegate_types::keys::ALBUM_DROP_KIND;
use std::time::Duration;

pub fn album_drop_parameter_shape() -> Vec<AbiType> {
    vec![AbiType::Address, AbiType::Uint(256)]
}

pub fn album_drop_value_shape() -> ValueShape {
    ValueShape::new([("released", AbiType::Bool), ("beneficiary", AbiType::Address)])
}

/// `(contract, album_id)` as a parameter tuple value list.
pub fn album_drop_parameters(contract: Address, album_id: U256) -> Vec<AbiValue> {
    vec![AbiValue::Address(contract), AbiValue::Uint(album_id)]
}

/// The payload and identifier reporters answer for this album.
pub fn album_drop_query(
    contract: Address,
    album_id: U256,
) -> Result<(QueryPayload, QueryId), EncodingError> {
    let params = QueryParameters::new(
        album_drop_parameter_shape(),
        album_drop_parameters(contract, album_id),
    );
    query_id(ALBUM_DROP_KIND, &params)
}

/// The value bytes a reporter submits.
pub fn album_drop_value(released: bool, beneficiary: Address) -> Result<Vec<u8>, EncodingError> {
    encode_value(
        &[AbiValue::Bool(released), AbiValue::Address(beneficiary)],
        &album_drop_value_shape(),
    )
}

pub fn album_drop_condition(max_age: Duration) -> ConditionSpec {
    ConditionSpec {
        kind: ALBUM_DROP_KIND.to_string(),
        parameter_shape: album_drop_parameter_shape(),
        value_shape: album_drop_value_shape(),
        max_age,
    }
}

/// A decoded albumDrop value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlbumRelease {
    pub released: bool,
    pub beneficiary: Address,
}

impl TryFrom<&DecodedValue> for AlbumRelease {
    type Error = DecodeError;

    fn try_from(v: &DecodedValue) -> Result<Self, Self::Error> {
        Ok(Self {
            released: v.bool_at(0)?,
            beneficiary: v.address_at(1)?,
        })
    }
}

/// Moves escrowed funds to a beneficiary. Token accounting lives elsewhere.
#[async_trait]
pub trait EscrowRelease: Send + Sync {
    async fn release(&self, identifier: &QueryId, beneficiary: Address) -> Result<(), ActionError>;
}

/// Releases escrow when the reported value says the album is out.
///
/// A `released == false` report is rejected rather than treated as done, so a
/// later corrected report can still release the funds.
pub struct FundRelease<E> {
    escrow: E,
}

impl<E: EscrowRelease> FundRelease<E> {
    pub fn new(escrow: E) -> Self {
        Self { escrow }
    }

    pub fn escrow(&self) -> &E {
        &self.escrow
    }
}

#[async_trait]
impl<E: EscrowRelease> ReleaseAction for FundRelease<E> {
    async fn execute(
        &self,
        identifier: &QueryId,
        value: &DecodedValue,
        retrieved: &RetrievedValue,
    ) -> Result<(), ActionError> {
        let album =
            AlbumRelease::try_from(value).map_err(|e| ActionError::Rejected(e.to_string()))?;
        if !album.released {
            tracing::info!(
                target: "consumer",
                identifier = %identifier,
                reporter = %retrieved.reporter,
                "album reported as not released"
            );
            return Err(ActionError::Rejected("album not released".into()));
        }
        self.escrow.release(identifier, album.beneficiary).await
    }
}
