//! 编排服务端到端测试
//!
//! 离线适配器 + 内存/文件存储，覆盖派生、删除、持久化、余额和转账流程

mod common;

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use common::{harness, FlakyStore, TEST_MNEMONIC};
use seedwallet::domain::chain_profile::ChainFamily;
use seedwallet::error::{OutcomeKind, WalletError};
use seedwallet::infrastructure::storage::{FileStore, MemoryStore, PersistenceStore};
use seedwallet::service::{OrchestratorOptions, SessionState};

#[tokio::test]
async fn test_end_to_end_indices_are_never_reused() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;

    o.select_profile(ChainFamily::Solana).await;
    let secret = o.generate_secret().await.unwrap();
    assert_eq!(secret.word_count(), 12);

    let first = o.request_account().await.unwrap();
    let second = o.request_account().await.unwrap();
    assert_eq!(first.account_index(), 0);
    assert_eq!(second.account_index(), 1);
    assert_ne!(first.public_key(), second.public_key());

    o.remove_account(ChainFamily::Solana, 0).await.unwrap();
    let third = o.request_account().await.unwrap();
    assert_eq!(third.account_index(), 2);

    let indices: Vec<u32> = o
        .accounts_for(ChainFamily::Solana)
        .await
        .iter()
        .map(|a| a.account_index())
        .collect();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(o.state().await, SessionState::AccountsActive);
}

#[tokio::test]
async fn test_known_addresses_for_test_mnemonic() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;

    o.select_profile(ChainFamily::Ethereum).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    let eth = o.request_account().await.unwrap();
    assert_eq!(eth.address(), "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(eth.derivation_path(), "m/44'/60'/0'/0/0");

    o.select_profile(ChainFamily::Solana).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    let sol = o.request_account().await.unwrap();
    assert_eq!(sol.address(), "HAgk14JpMQLgt6rVgv7cBQFJWFto5Dqxi472uT3DKpqk");
    assert_eq!(sol.derivation_path(), "m/44'/501'/0'/0'");

    // 两个链族的计数器相互独立
    assert_eq!(o.next_index(ChainFamily::Ethereum).await, 1);
    assert_eq!(o.next_index(ChainFamily::Solana).await, 1);
}

#[tokio::test]
async fn test_same_secret_reproduces_accounts() {
    let a = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let b = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;

    for h in [&a, &b] {
        h.orchestrator.select_profile(ChainFamily::Solana).await;
        h.orchestrator.import_secret(TEST_MNEMONIC).await.unwrap();
        for _ in 0..3 {
            h.orchestrator.request_account().await.unwrap();
        }
    }

    let left = a.orchestrator.accounts().await;
    let right = b.orchestrator.accounts().await;
    assert_eq!(left, right);
}

#[tokio::test]
async fn test_registry_survives_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn PersistenceStore> = Arc::new(FileStore::new(dir.path()));

    {
        let h = harness(store.clone(), OrchestratorOptions::default()).await;
        h.orchestrator.select_profile(ChainFamily::Ethereum).await;
        h.orchestrator.import_secret(TEST_MNEMONIC).await.unwrap();
        h.orchestrator.request_account().await.unwrap();
        h.orchestrator.request_account().await.unwrap();
        h.orchestrator
            .remove_account(ChainFamily::Ethereum, 1)
            .await
            .unwrap();
    }

    let h = harness(store, OrchestratorOptions::default()).await;
    let accounts = h.orchestrator.accounts().await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(
        accounts[0].address(),
        "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
    );

    // 删除的索引 1 不会被重新分配
    h.orchestrator.select_profile(ChainFamily::Ethereum).await;
    h.orchestrator.import_secret(TEST_MNEMONIC).await.unwrap();
    let next = h.orchestrator.request_account().await.unwrap();
    assert_eq!(next.account_index(), 2);
}

#[tokio::test]
async fn test_corrupt_state_starts_empty() {
    let store = Arc::new(MemoryStore::new());
    store.put("registry", "{\"accounts\": 42}").await.unwrap();

    let h = harness(store.clone(), OrchestratorOptions::default()).await;
    assert!(h.orchestrator.accounts().await.is_empty());

    // 下一次修改覆盖损坏的数据
    h.orchestrator.select_profile(ChainFamily::Solana).await;
    h.orchestrator.import_secret(TEST_MNEMONIC).await.unwrap();
    h.orchestrator.request_account().await.unwrap();

    let raw = store.get("registry").await.unwrap().unwrap();
    assert!(seedwallet::domain::WalletRegistry::deserialize(&raw).is_ok());
}

#[tokio::test]
async fn test_balance_refresh_and_failure_isolation() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Solana).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    let first = o.request_account().await.unwrap();
    let second = o.request_account().await.unwrap();

    h.solana.set_balance(first.address(), 1_500_000_000);
    h.solana.set_balance(second.address(), 7);

    let results = o.refresh_all(ChainFamily::Solana).await;
    assert_eq!(results.len(), 2);
    assert_eq!(*results[0].1.as_ref().unwrap(), 1_500_000_000);
    assert_eq!(*results[1].1.as_ref().unwrap(), 7);

    let cached = o.find(ChainFamily::Solana, 0).await.unwrap();
    assert_eq!(cached.cached_balance(), 1_500_000_000);
    assert!(cached.last_balance_refresh().is_some());

    // 网络失败只影响本次操作，缓存保持不变
    h.solana.fail_balance_queries(true);
    let err = o.refresh_balance(ChainFamily::Solana, 0).await.unwrap_err();
    assert!(matches!(err, WalletError::BalanceQuery { .. }));
    assert_eq!(h.sink.last().unwrap().outcome, OutcomeKind::NetworkError);
    assert_eq!(
        o.find(ChainFamily::Solana, 0).await.unwrap().cached_balance(),
        1_500_000_000
    );
}

#[tokio::test]
async fn test_transfer_validates_recipient_at_boundary() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Ethereum).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    o.request_account().await.unwrap();

    let err = o
        .transfer(ChainFamily::Ethereum, 0, "0xnot-an-address", Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidRecipient { .. }));
    assert_eq!(h.sink.last().unwrap().outcome, OutcomeKind::UserError);

    let err = o
        .transfer(
            ChainFamily::Ethereum,
            0,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            Decimal::ZERO,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));

    // 适配器从未被调用
    assert!(h.ethereum.transfers().is_empty());
}

#[tokio::test]
async fn test_transfer_success_refreshes_sender() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Solana).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    let sender = o.request_account().await.unwrap();
    h.solana.set_balance(sender.address(), 900);

    let amount = Decimal::from_str("0.25").unwrap();
    let to = "DYw8jCTfwHNRJhhmFcbXvVDTqWMEVFBX6ZKUmG5CNSKK";
    let tx_id = o
        .transfer(ChainFamily::Solana, 0, to, amount)
        .await
        .unwrap();
    assert_eq!(tx_id, "fake-tx-1");

    let transfers = h.solana.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].to, to);
    assert_eq!(transfers[0].amount_native, amount);
    assert_eq!(transfers[0].private_key, sender.private_key());

    assert_eq!(
        o.find(ChainFamily::Solana, 0).await.unwrap().cached_balance(),
        900
    );

    let operations: Vec<_> = h.sink.records().iter().map(|n| n.operation).collect();
    assert!(operations.ends_with(&["transfer", "refresh_balance"]));
}

#[tokio::test]
async fn test_rejected_transfer_is_network_error() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Solana).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    o.request_account().await.unwrap();
    h.solana.reject_transfers(true);

    let err = o
        .transfer(
            ChainFamily::Solana,
            0,
            "DYw8jCTfwHNRJhhmFcbXvVDTqWMEVFBX6ZKUmG5CNSKK",
            Decimal::ONE,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::TransferRejected {
            family: ChainFamily::Solana,
            ..
        }
    ));
    // 底层原因保留在消息中
    assert!(err.to_string().contains("insufficient funds"));

    let last = h.sink.last().unwrap();
    assert_eq!(last.operation, "transfer");
    assert_eq!(last.outcome, OutcomeKind::NetworkError);
    assert_eq!(last.code, Some("transfer_rejected"));
}

#[tokio::test]
async fn test_faucet_returns_hint_for_existing_account() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Ethereum).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    o.request_account().await.unwrap();

    assert_eq!(
        o.faucet(ChainFamily::Ethereum, 0).await.unwrap(),
        "https://faucet.example"
    );
    assert_eq!(h.sink.last().unwrap().outcome, OutcomeKind::Success);
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_indices() {
    let h = harness(Arc::new(MemoryStore::new()), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Solana).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();

    let results = futures::future::join_all((0..8).map(|_| o.request_account())).await;
    let mut indices: Vec<u32> = results
        .into_iter()
        .map(|r| r.unwrap().account_index())
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_failed_save_leaves_registry_unchanged() {
    let store = Arc::new(FlakyStore::new());
    let h = harness(store.clone(), OrchestratorOptions::default()).await;
    let o = &h.orchestrator;
    o.select_profile(ChainFamily::Solana).await;
    o.import_secret(TEST_MNEMONIC).await.unwrap();
    let first = o.request_account().await.unwrap();

    store.fail_puts(true);
    let err = o.request_account().await.unwrap_err();
    assert!(matches!(err, WalletError::Storage(_)));
    assert_eq!(h.sink.last().unwrap().code, Some("storage_error"));
    assert_eq!(o.accounts().await, vec![first.clone()]);
    assert_eq!(o.next_index(ChainFamily::Solana).await, 1);

    // 删除同样不生效
    assert!(o.remove_account(ChainFamily::Solana, 0).await.is_err());
    assert_eq!(o.accounts().await.len(), 1);

    // 存储恢复后，失败的那次没有消耗索引
    store.fail_puts(false);
    let second = o.request_account().await.unwrap();
    assert_eq!(second.account_index(), 1);

    let raw = store.get("registry").await.unwrap().unwrap();
    let persisted = seedwallet::domain::WalletRegistry::deserialize(&raw).unwrap();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted.next_index(ChainFamily::Solana), 2);
}
