/// Voting power aggregation across a space's strategies at one snapshot block.
use crate::config::QueryLimits;
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::types::{SnapshotInfo, StrategyKind, StrategyParsedMetadata, VotingPower};
use crate::features::evm::ChainProvider;
use crate::features::metadata::MetadataResolver;
use crate::strategy::registry::StrategyRegistry;
use futures::stream::{self, StreamExt, TryStreamExt};

#[derive(Clone, Copy, Debug)]
pub struct VotingPowerRequest<'a> {
    pub strategies_addresses: &'a [String],
    pub strategies_params: &'a [String],
    pub strategies_metadata: &'a [StrategyParsedMetadata],
    pub voter: &'a str,
    pub snapshot: SnapshotInfo,
}

pub struct VotingPowerAggregator<'a> {
    pub registry: &'a StrategyRegistry,
    pub provider: &'a dyn ChainProvider,
    pub metadata: &'a dyn MetadataResolver,
    pub chain_id: u64,
    pub limits: QueryLimits,
}

impl VotingPowerAggregator<'_> {
    /// One entry per input strategy, in input order. Unknown strategies yield a zero
    /// placeholder; any other failure fails the whole batch.
    pub async fn get_voting_power(
        &self,
        request: VotingPowerRequest<'_>,
    ) -> GovernanceResult<Vec<VotingPower>> {
        let block = request.snapshot.at.ok_or(GovernanceError::MissingSnapshotBlock)?;
        let addresses = request.strategies_addresses.len();
        if request.strategies_params.len() != addresses
            || request.strategies_metadata.len() != addresses
        {
            return Err(GovernanceError::LengthMismatch {
                addresses,
                params: request.strategies_params.len(),
                metadata: request.strategies_metadata.len(),
            });
        }

        let concurrency = self.limits.max_concurrency.max(1);
        stream::iter(0..addresses)
            .map(|index| self.query_with_timeout(request, index, block))
            .buffered(concurrency)
            .try_collect()
            .await
    }

    async fn query_with_timeout(
        &self,
        request: VotingPowerRequest<'_>,
        index: usize,
        block: u64,
    ) -> GovernanceResult<VotingPower> {
        let address = &request.strategies_addresses[index];
        match tokio::time::timeout(self.limits.query_timeout, self.query(request, index, block))
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(GovernanceError::QueryTimeout {
                address: address.clone(),
                timeout_ms: u64::try_from(self.limits.query_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            }),
        }
    }

    async fn query(
        &self,
        request: VotingPowerRequest<'_>,
        index: usize,
        block: u64,
    ) -> GovernanceResult<VotingPower> {
        let address = &request.strategies_addresses[index];
        let Some(strategy) = self.registry.get(address) else {
            log::warn!("voting_power_unknown_strategy address={address} chain_id={}", self.chain_id);
            return Ok(VotingPower::unknown(address));
        };

        let params = &request.strategies_params[index];
        let parsed = &request.strategies_metadata[index];
        let metadata = self.metadata.resolve(parsed.payload.as_deref()).await?;
        let value = strategy
            .get_voting_power(
                address,
                request.voter,
                metadata.as_ref(),
                block,
                params,
                self.provider,
            )
            .await?;

        let kind = strategy.kind();
        let token = kind.is_token_backed().then(|| params.clone());
        let swap_link = token
            .as_deref()
            .and_then(|token| swap_link(kind, token, self.chain_id));
        log::debug!(
            "voting_power_strategy address={address} kind={} block={block} value={value}",
            kind.as_str()
        );
        Ok(VotingPower {
            address: address.clone(),
            value,
            decimals: parsed.decimals,
            symbol: parsed.symbol.clone(),
            token,
            swap_link,
        })
    }
}

/// Uniswap link for buying the voting token of a token-backed strategy.
pub fn swap_link(kind: StrategyKind, token: &str, chain_id: u64) -> Option<String> {
    if !kind.is_token_backed() {
        return None;
    }
    let chain = match chain_id {
        1 => "mainnet",
        10 => "optimism",
        137 => "polygon",
        42_161 => "arbitrum",
        _ => return None,
    };
    Some(format!(
        "https://app.uniswap.org/swap?chain={chain}&outputCurrency={token}"
    ))
}
