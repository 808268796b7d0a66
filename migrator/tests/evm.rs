mod common;

use {
    assert_matches::assert_matches,
    common::{handler, reply, runtime, Handler, MockNode, TIMEOUT},
    darwinia_migration_sdk::AccountId20,
    darwinia_migrator::{
        error::EvmError,
        evm::{
            encode_multisig_call, CodeProbe, EvmClient, MultisigFactory, MultisigFactoryContract,
            COMPUTE_ADDRESS_SIGNATURE, DEPLOY_SIGNATURE,
        },
        rpc::HttpClient,
        signer::{EvmKey, LegacyTransaction},
    },
    serde_json::{json, Value},
    std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    },
};

const FACTORY: AccountId20 = AccountId20([0xfa; 20]);
const DEPLOYER_SECRET: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
const DEPLOYER: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

fn deployer() -> EvmKey {
    EvmKey::from_hex(DEPLOYER_SECRET).unwrap()
}

/// Node methods a signed transaction needs besides the receipt.
fn signing_methods(hash: &'static str) -> Vec<(&'static str, Handler)> {
    vec![
        ("eth_chainId", reply(json!("0x2e"))),
        ("eth_getTransactionCount", reply(json!("0x7"))),
        ("eth_gasPrice", reply(json!("0x3b9aca00"))),
        ("eth_estimateGas", reply(json!("0x7a120"))),
        ("eth_sendRawTransaction", reply(json!(hash))),
    ]
}

fn evm_client(node: &MockNode) -> Arc<EvmClient> {
    Arc::new(EvmClient::new(HttpClient::new(node.url.clone(), TIMEOUT).unwrap()))
}

fn factory(node: &MockNode, attempts: u32) -> MultisigFactoryContract {
    MultisigFactoryContract::new(evm_client(node), FACTORY, attempts).with_receipt_poll_interval(Duration::from_millis(10))
}

#[test]
fn test_code_probe() {
    let node = MockNode::start(vec![(
        "eth_getCode",
        handler(|params| {
            // only the first address has code
            let code = if params[0] == json!(AccountId20([1; 20]).to_lower_hex()) {
                "0x6080604052"
            } else {
                "0x"
            };
            Ok(json!(code))
        }),
    )]);
    let client = evm_client(&node);
    let rt = runtime();
    assert!(rt.block_on(client.has_code(&AccountId20([1; 20]))).unwrap());
    assert!(!rt.block_on(client.has_code(&AccountId20([2; 20]))).unwrap());
    assert_eq!(node.requests_for("eth_getCode")[0][1], json!("latest"));
}

#[test]
fn test_compute_address_calls_factory() {
    let computed = AccountId20([0xcc; 20]);
    let node = MockNode::start(vec![(
        "eth_call",
        reply(json!(format!("0x{:0>64}", hex::encode(computed.0)))),
    )]);
    let members = [AccountId20([0x11; 20]), AccountId20([0x22; 20])];

    let address = runtime()
        .block_on(factory(&node, 1).compute_address(&[0xaa; 32], &members, 2))
        .unwrap();
    assert_eq!(address, computed);

    let call = &node.requests_for("eth_call")[0][0];
    assert_eq!(call["to"], json!(FACTORY.to_lower_hex()));
    let data = encode_multisig_call(COMPUTE_ADDRESS_SIGNATURE, &[0xaa; 32], &members, 2);
    assert_eq!(call["data"], json!(format!("0x{}", hex::encode(data))));
}

#[test]
fn test_deploy_waits_for_receipt() {
    let polls = Arc::new(AtomicUsize::new(0));
    let receipt_polls = polls.clone();
    let mut methods = signing_methods("0xfeed");
    methods.push((
        "eth_getTransactionReceipt",
        handler(move |_| {
            // mined on the third poll
            if receipt_polls.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(Value::Null)
            } else {
                Ok(json!({"status": "0x1", "blockNumber": "0x10"}))
            }
        }),
    ));
    let node = MockNode::start(methods);
    let members = [AccountId20([0x11; 20])];

    let hash = runtime()
        .block_on(factory(&node, 5).deploy(&[0xaa; 32], &members, 1, &deployer()))
        .unwrap();
    assert_eq!(hash, "0xfeed");
    assert_eq!(polls.load(Ordering::SeqCst), 3);

    let data = encode_multisig_call(DEPLOY_SIGNATURE, &[0xaa; 32], &members, 1);
    assert_eq!(node.requests_for("eth_getTransactionCount")[0], json!([DEPLOYER, "pending"]));
    let estimate = &node.requests_for("eth_estimateGas")[0][0];
    assert_eq!(estimate["from"], json!(DEPLOYER));
    assert_eq!(estimate["data"], json!(format!("0x{}", hex::encode(&data))));

    let expected = deployer().sign_transaction(&LegacyTransaction {
        nonce: 7,
        gas_price: 1_000_000_000,
        gas: 500_000,
        to: FACTORY,
        value: 0,
        data,
        chain_id: 46,
    });
    assert_eq!(
        node.requests_for("eth_sendRawTransaction")[0],
        json!([format!("0x{}", hex::encode(expected))])
    );
    assert!(node.requests_for("eth_sendTransaction").is_empty());
}

#[test]
fn test_deploy_failures() {
    let mut methods = signing_methods("0xfeed");
    methods.push(("eth_getTransactionReceipt", reply(json!({"status": "0x0"}))));
    let node = MockNode::start(methods);
    assert_matches!(
        runtime().block_on(factory(&node, 3).deploy(&[0xaa; 32], &[], 1, &deployer())),
        Err(EvmError::Reverted(hash)) if hash == "0xfeed"
    );

    let mut methods = signing_methods("0xbeef");
    methods.push(("eth_getTransactionReceipt", reply(Value::Null)));
    let pending = MockNode::start(methods);
    assert_matches!(
        runtime().block_on(factory(&pending, 3).deploy(&[0xaa; 32], &[], 1, &deployer())),
        Err(EvmError::ReceiptTimeout(hash)) if hash == "0xbeef"
    );
    assert_eq!(pending.requests_for("eth_getTransactionReceipt").len(), 3);

    let mut methods = signing_methods("0xfeed");
    methods[0] = ("eth_chainId", reply(json!("not a quantity")));
    let broken = MockNode::start(methods);
    assert_matches!(
        runtime().block_on(factory(&broken, 3).deploy(&[0xaa; 32], &[], 1, &deployer())),
        Err(EvmError::InvalidResponse(_))
    );
    assert!(broken.requests_for("eth_sendRawTransaction").is_empty());
}
