use crate::primitives::{
    ChainId,
    ContractAddress,
    ProjectId,
};
use url::Url;

/// A project owning asset snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub issuer_contract_address: ContractAddress,
    pub chain_id: ChainId,
    /// RPC endpoint to use instead of the default one of the chain.
    pub custom_rpc_url: Option<Url>,
}

/// Chain to query and how to reach it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChainSpec {
    pub chain_id: ChainId,
    pub custom_rpc_url: Option<Url>,
}

impl ChainSpec {
    pub fn new(chain_id: ChainId, custom_rpc_url: Option<Url>) -> Self {
        Self {
            chain_id,
            custom_rpc_url,
        }
    }
}
