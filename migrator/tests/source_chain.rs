mod common;

use {
    assert_matches::assert_matches,
    codec::Encode,
    common::{fail, reply, runtime, MockNode, TIMEOUT},
    darwinia_migration_sdk::{
        account_migration::{
            state::{AccountData, AccountInfo, MultisigMigrationDetail},
            storage::{to_hex_key, MigrationItem, StorageHasher},
        },
        AccountId20, AccountId32,
    },
    darwinia_migrator::{
        error::RpcError,
        rpc::{HttpClient, WsClient},
        source_chain::{SourceChain, SubstrateClient},
    },
    serde_json::{json, Value},
};

fn client(node: &MockNode, hasher: StorageHasher) -> SubstrateClient {
    SubstrateClient::new(
        HttpClient::new(node.url.clone(), TIMEOUT).unwrap(),
        WsClient::new("ws://127.0.0.1:1", TIMEOUT),
        hasher,
    )
}

fn scale_hex<T: Encode>(value: &T) -> Value {
    json!(format!("0x{}", hex::encode(value.encode())))
}

#[test]
fn test_http_client_round_trip() {
    let node = MockNode::start(vec![
        ("system_name", reply(json!("darwinia-node"))),
        ("system_health", fail(-32000, "node is syncing")),
    ]);
    let http = HttpClient::new(node.url.clone(), TIMEOUT).unwrap();
    let rt = runtime();

    let name: String = rt.block_on(http.call("system_name", json!([]))).unwrap();
    assert_eq!(name, "darwinia-node");
    assert_matches!(
        rt.block_on(http.call::<Value>("system_health", json!([]))),
        Err(RpcError::Remote { code: -32000, message }) if message == "node is syncing"
    );
    assert_matches!(
        rt.block_on(http.call::<Value>("system_peers", json!([]))),
        Err(RpcError::Remote { code: -32601, .. })
    );
}

#[test]
fn test_multisig_status_reads_pallet_storage() {
    let who = AccountId32([5; 32]);
    let detail = MultisigMigrationDetail {
        to: AccountId20([0x22; 20]),
        members: vec![(AccountId32([1; 32]), true), (AccountId32([2; 32]), false)],
        threshold: 2,
    };
    let node = MockNode::start(vec![("state_getStorage", reply(scale_hex(&detail)))]);
    let chain = client(&node, StorageHasher::Identity);

    let status = runtime().block_on(chain.multisig_status(&who)).unwrap();
    assert_eq!(status, Some(detail));

    let requests = node.requests_for("state_getStorage");
    let key = to_hex_key(&MigrationItem::Multisigs.key(StorageHasher::Identity, &who));
    assert_eq!(requests, vec![json!([key])]);
}

#[test]
fn test_historical_reads_pass_the_block_hash() {
    let info = AccountInfo {
        nonce: 3,
        data: AccountData {
            free: 1_000,
            ..Default::default()
        },
        ..Default::default()
    };
    let node = MockNode::start(vec![("state_getStorage", reply(scale_hex(&info)))]);
    let chain = client(&node, StorageHasher::Blake2_128Concat);
    let who = AccountId32([5; 32]);

    let read = runtime()
        .block_on(chain.account_info(&who, Some("0xparent")))
        .unwrap();
    assert_eq!(read, Some(info));

    let key = to_hex_key(&MigrationItem::Accounts.key(StorageHasher::Blake2_128Concat, &who));
    assert_eq!(node.requests_for("state_getStorage"), vec![json!([key, "0xparent"])]);
}

#[test]
fn test_missing_entries() {
    let node = MockNode::start(vec![("state_getStorage", reply(Value::Null))]);
    let chain = client(&node, StorageHasher::Identity);
    let rt = runtime();

    assert_eq!(rt.block_on(chain.multisig_status(&AccountId32([5; 32]))).unwrap(), None);
    assert_eq!(rt.block_on(chain.kton_balance(&AccountId32([5; 32]), None)).unwrap(), 0);
    assert!(rt.block_on(chain.deposits(&AccountId32([5; 32]), None)).unwrap().is_empty());
    assert!(rt.block_on(chain.is_evm_account_free(&AccountId20([9; 20]))).unwrap());
}

#[test]
fn test_undecodable_storage() {
    let node = MockNode::start(vec![("state_getStorage", reply(json!("0x0102")))]);
    let chain = client(&node, StorageHasher::Identity);
    assert_matches!(
        runtime().block_on(chain.multisig_status(&AccountId32([5; 32]))),
        Err(RpcError::Decode { what: "multisig migration", .. })
    );
}

#[test]
fn test_runtime_version_and_header() {
    let node = MockNode::start(vec![
        ("state_getRuntimeVersion", reply(json!({"specName": "darwinia2", "specVersion": 6100}))),
        ("chain_getHeader", reply(json!({"number": "0x1b4", "parentHash": "0x00"}))),
    ]);
    let chain = client(&node, StorageHasher::Identity);
    let rt = runtime();
    assert_eq!(rt.block_on(chain.spec_name()).unwrap(), "darwinia2");
    assert_eq!(rt.block_on(chain.best_block_number()).unwrap(), 436);
}
