use {
    darwinia_migration_sdk::AddressError,
    std::io,
    thiserror::Error,
    tokio_tungstenite::tungstenite,
};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rpc error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
    #[error("extrinsic {0}")]
    ExtrinsicRejected(String),
    #[error("request timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("indexer transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid indexer response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("indexer returned errors: {0}")]
    Query(String),
    #[error("indexer responded with status {0}")]
    Status(u16),
}

#[derive(Error, Debug)]
pub enum EvmError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("transaction {0} reverted")]
    Reverted(String),
    #[error("no receipt for transaction {0}")]
    ReceiptTimeout(String),
    #[error("invalid contract response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] io::Error),
    #[error("store is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("no accounts available for signing")]
    Empty,
    #[error("account {0} is not managed by this keyring")]
    UnknownAccount(String),
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}

/// Errors surfaced by the migration flows. Every variant is recoverable;
/// callers turn them into a notification and let the user retry.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("no wallet is available")]
    WalletNotInstalled,
    #[error("wallet rejected the request for {0}")]
    WalletConnectionRejected(String),
    #[error("chain query failed: {0}")]
    ChainQuery(#[from] RpcError),
    #[error("extrinsic submission failed: {0}")]
    ExtrinsicSubmission(String),
    #[error("contract call failed: {0}")]
    ContractCall(#[from] EvmError),
    #[error("indexer query failed: {0}")]
    IndexerQuery(#[from] IndexerError),
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error("{0} is not a member of the multisig")]
    NotAMember(String),
    #[error("{0} has already approved the migration")]
    AlreadyApproved(String),
    #[error("{0} has no pending multisig migration")]
    NotPending(String),
    #[error("{0} does not exist on the source chain")]
    AccountNotFound(String),
    #[error("{0} has already been migrated")]
    AlreadyMigrated(String),
    #[error("{0} is already in use on the destination chain")]
    DestinationInUse(String),
    #[error("could not generate address: {0}")]
    AddressNotGenerated(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SignerError> for MigrationError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Empty => MigrationError::WalletNotInstalled,
            SignerError::UnknownAccount(account) => MigrationError::WalletConnectionRejected(account),
            SignerError::InvalidSeed(reason) => MigrationError::Config(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    #[test]
    fn test_signer_error_maps_to_wallet_taxonomy() {
        assert_matches!(
            MigrationError::from(SignerError::Empty),
            MigrationError::WalletNotInstalled
        );
        assert_matches!(
            MigrationError::from(SignerError::UnknownAccount("5Grw".to_string())),
            MigrationError::WalletConnectionRejected(account) if account == "5Grw"
        );
    }

    #[test]
    fn test_address_error_is_transparent() {
        let err = MigrationError::from(AddressError::BadChecksum);
        assert_eq!(err.to_string(), "ss58 checksum mismatch");
    }
}
