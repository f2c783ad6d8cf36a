pub mod logging;
pub mod rpc_client;
pub mod rpc_validator;
pub mod storage;
