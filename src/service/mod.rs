pub mod chain_adapter;
pub mod ethereum_adapter;
pub mod notification;
pub mod orchestrator;
pub mod solana_adapter;

pub use chain_adapter::{AdapterSet, ChainAdapter};
pub use ethereum_adapter::EthereumAdapter;
pub use notification::{Notification, NotificationSink, RecordingSink, TracingSink};
pub use orchestrator::{OrchestratorOptions, SessionState, WalletOrchestrator};
pub use solana_adapter::SolanaAdapter;
