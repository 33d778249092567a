use crate::primitives::{
    BlockNumber,
    ContractAddress,
    TransactionHash,
    WalletAddress,
};

/// The transaction that deployed a contract, as reported by the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractDeploymentTransactionInfo {
    pub hash: TransactionHash,
    pub contract_address: ContractAddress,
    pub deployer: WalletAddress,
    /// Unknown while the transaction is not mined.
    pub block_number: Option<BlockNumber>,
}
