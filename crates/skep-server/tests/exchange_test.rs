//! End-to-end exchange tests over loopback TCP.
//!
//! Each test starts a real `ExchangeServer` on an ephemeral port with
//! an in-memory store, a seeded knowledge table, and a scripted
//! oracle, then drives it either through `skep-client` (the normal
//! path) or through a raw framed stream (to reach server edge cases
//! the client's own validation would catch first).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};

use skep_client::{BinClient, CheckinOutcome, ClientConfig, ClientError};
use skep_proto::wire::message_stream;
use skep_proto::{Category, FillPercent, FillTier, Location, ReceptacleKey};
use skep_server::{
    ConsistencyMode, ExchangeServer, ExchangeServices, ProtocolVariant, ScriptedOracle,
    ServerConfig,
};
use skep_store::{BinStore, KnowledgeTable, MemoryBinStore};

// ==================== Helper Functions ====================

fn key(location: &str, category: u8) -> ReceptacleKey {
    ReceptacleKey::new(
        Location::parse(location).unwrap(),
        Category::new(category).unwrap(),
    )
}

fn percent(value: u8) -> FillPercent {
    FillPercent::new(value).unwrap()
}

fn knowledge() -> KnowledgeTable {
    KnowledgeTable::new()
        .with_item("plastic bottle", Category::new(1).unwrap())
        .unwrap()
        .with_item("battery", Category::new(2).unwrap())
        .unwrap()
        .with_item("banana peel", Category::new(3).unwrap())
        .unwrap()
        .with_item("ceramic shard", Category::new(4).unwrap())
        .unwrap()
}

struct TestBackend {
    addr: SocketAddr,
    store: Arc<MemoryBinStore>,
    oracle: Arc<ScriptedOracle>,
}

/// Start a server with receptacles ABCDE_1..=4 provisioned at 10%.
async fn start_server(variant: ProtocolVariant, consistency: ConsistencyMode) -> TestBackend {
    let store = Arc::new(
        MemoryBinStore::new()
            .with_receptacle(key("ABCDE", 1), percent(10))
            .with_receptacle(key("ABCDE", 2), percent(10))
            .with_receptacle(key("ABCDE", 3), percent(10))
            .with_receptacle(key("ABCDE", 4), percent(10)),
    );
    let oracle = Arc::new(ScriptedOracle::new());
    let services = ExchangeServices {
        store: Arc::clone(&store) as Arc<dyn BinStore>,
        gateway: Arc::new(knowledge()),
        oracle: Arc::clone(&oracle) as Arc<dyn skep_server::VisionOracle>,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig::new(addr, variant)
        .with_receive_timeout(Duration::from_secs(5))
        .with_consistency(consistency);
    let mut server = ExchangeServer::new(config, services);
    tokio::spawn(async move { server.run(listener).await.unwrap() });

    TestBackend {
        addr,
        store,
        oracle,
    }
}

fn client_for(addr: SocketAddr) -> BinClient {
    BinClient::new(
        ClientConfig::new(addr)
            .with_connect_timeout(Duration::from_secs(1))
            .with_receive_timeout(Duration::from_secs(5)),
    )
}

async fn raw_connect(addr: SocketAddr) -> skep_proto::MessageStream {
    message_stream(TcpStream::connect(addr).await.unwrap(), 4096)
}

// ==================== Single-phase ====================

#[tokio::test]
async fn single_phase_successful_deposit() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("banana peel");
    backend.oracle.push_fill(percent(40));

    let report = client_for(backend.addr)
        .deposit("/trash/ABCDE_3.jpg")
        .await
        .unwrap();

    assert_eq!(report.category, Some(Category::new(3).unwrap()));
    assert_eq!(report.storage, Some(percent(40)));
    assert_eq!(report.tier(), Some(FillTier::Normal));
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 3)).unwrap(),
        Some(percent(40))
    );
}

#[tokio::test]
async fn single_phase_malformed_request_gets_sentinel_pair() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;

    // Category 9 is out of range; bypass the client's own validation.
    let mut stream = raw_connect(backend.addr).await;
    stream.send("/trash/ABCDE_9.jpg").await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "5");
    assert_eq!(stream.next().await.unwrap().unwrap(), "0");
    assert!(stream.next().await.is_none());

    // No store mutation, no oracle consumption.
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 3)).unwrap(),
        Some(percent(10))
    );
}

#[tokio::test]
async fn single_phase_unknown_receptacle_still_reports_storage() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("banana peel");
    backend.oracle.push_fill(percent(40));

    // Valid identifier, never provisioned.
    let report = client_for(backend.addr)
        .deposit("/trash/FGHIJ_2.jpg")
        .await
        .unwrap();

    assert_eq!(report.category, None);
    assert_eq!(report.storage, Some(percent(40)));
    assert_eq!(backend.store.get_storage(&key("FGHIJ", 2)).unwrap(), None);
}

#[tokio::test]
async fn single_phase_unknown_waste_updates_storage_anyway() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("mystery object");
    backend.oracle.push_fill(percent(55));

    let report = client_for(backend.addr)
        .deposit("/trash/ABCDE_2.jpg")
        .await
        .unwrap();

    // Sentinel category, but the update already happened and the
    // storage reply carries the supplied percent.
    assert_eq!(report.category, None);
    assert_eq!(report.storage, Some(percent(55)));
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 2)).unwrap(),
        Some(percent(55))
    );
}

#[tokio::test]
async fn single_phase_oracle_failure_yields_sentinel_pair() {
    // No scripted answers at all.
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;

    let report = client_for(backend.addr)
        .deposit("/trash/ABCDE_3.jpg")
        .await
        .unwrap();

    assert_eq!(report.category, None);
    assert_eq!(report.storage, Some(percent(0)));
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 3)).unwrap(),
        Some(percent(10))
    );
}

#[tokio::test]
async fn single_phase_repeat_is_idempotent_on_category() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;
    let client = client_for(backend.addr);

    backend.oracle.push_name("banana peel");
    backend.oracle.push_fill(percent(40));
    let first = client.deposit("/trash/ABCDE_3.jpg").await.unwrap();

    backend.oracle.push_name("banana peel");
    backend.oracle.push_fill(percent(70));
    let second = client.deposit("/trash/ABCDE_3.jpg").await.unwrap();

    assert_eq!(first.category, second.category);
    // Storage reflects only the latest supplied percent.
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 3)).unwrap(),
        Some(percent(70))
    );
}

// ==================== Two-phase ====================

#[tokio::test]
async fn two_phase_successful_checkin() {
    let backend = start_server(ProtocolVariant::TwoPhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("plastic bottle");
    backend.oracle.push_fill(percent(85));

    let client = client_for(backend.addr);
    let location = Location::parse("ABCDE").unwrap();
    let outcome = client
        .begin_checkin("/trash/outer.jpg", location)
        .await
        .unwrap();

    let CheckinOutcome::Accepted(exchange) = outcome else {
        panic!("check-in should have been accepted");
    };
    assert_eq!(exchange.category(), Category::new(1).unwrap());
    assert_eq!(exchange.expected_inner_name(), "ABCDE_1.jpg");
    assert!(exchange.inner_name_matches("/bins/ABCDE_1.jpg"));

    let report = exchange.complete("/bins/ABCDE_1.jpg").await.unwrap();
    assert_eq!(report.category, Some(Category::new(1).unwrap()));
    assert_eq!(report.storage, Some(percent(85)));
    assert_eq!(report.tier(), Some(FillTier::Full));
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 1)).unwrap(),
        Some(percent(85))
    );
}

#[tokio::test]
async fn two_phase_classification_miss_ends_after_round_one() {
    let backend = start_server(ProtocolVariant::TwoPhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("mystery object");

    let client = client_for(backend.addr);
    let location = Location::parse("ABCDE").unwrap();
    let outcome = client
        .begin_checkin("/trash/outer.jpg", location)
        .await
        .unwrap();

    assert!(matches!(outcome, CheckinOutcome::Rejected));
    // Nothing was written.
    for category in 1..=4 {
        assert_eq!(
            backend.store.get_storage(&key("ABCDE", category)).unwrap(),
            Some(percent(10))
        );
    }
}

#[tokio::test]
async fn two_phase_lenient_tolerates_inner_mismatch() {
    let backend = start_server(ProtocolVariant::TwoPhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("plastic bottle");
    backend.oracle.push_fill(percent(60));

    let client = client_for(backend.addr);
    let location = Location::parse("ABCDE").unwrap();
    let CheckinOutcome::Accepted(exchange) = client
        .begin_checkin("/trash/outer.jpg", location)
        .await
        .unwrap()
    else {
        panic!("check-in should have been accepted");
    };

    // Wrong embedded category; lenient mode only logs.
    let report = exchange.complete("/bins/ABCDE_9.jpg").await.unwrap();
    assert_eq!(report.storage, Some(percent(60)));
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 1)).unwrap(),
        Some(percent(60))
    );
}

#[tokio::test]
async fn two_phase_strict_rejects_inner_mismatch() {
    let backend = start_server(ProtocolVariant::TwoPhase, ConsistencyMode::Strict).await;
    backend.oracle.push_name("plastic bottle");
    backend.oracle.push_fill(percent(60));

    let client = client_for(backend.addr);
    let location = Location::parse("ABCDE").unwrap();
    let CheckinOutcome::Accepted(exchange) = client
        .begin_checkin("/trash/outer.jpg", location)
        .await
        .unwrap()
    else {
        panic!("check-in should have been accepted");
    };

    let report = exchange.complete("/bins/FGHIJ_1.jpg").await.unwrap();
    // Soft fallback: zero storage reported, nothing written.
    assert_eq!(report.storage, Some(percent(0)));
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 1)).unwrap(),
        Some(percent(10))
    );
}

#[tokio::test]
async fn two_phase_malformed_request_gets_single_sentinel() {
    let backend = start_server(ProtocolVariant::TwoPhase, ConsistencyMode::Lenient).await;

    let mut stream = raw_connect(backend.addr).await;
    stream.send("/trash/outer.jpg").await.unwrap(); // no separator
    assert_eq!(stream.next().await.unwrap().unwrap(), "5");
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn two_phase_non_jpg_inner_image_reports_zero() {
    let backend = start_server(ProtocolVariant::TwoPhase, ConsistencyMode::Lenient).await;
    backend.oracle.push_name("battery");
    backend.oracle.push_fill(percent(30));

    let mut stream = raw_connect(backend.addr).await;
    stream.send("/trash/outer.jpg|ABCDE").await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "2");
    stream.send("interior.txt").await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "0");
    assert!(stream.next().await.is_none());
    assert_eq!(
        backend.store.get_storage(&key("ABCDE", 2)).unwrap(),
        Some(percent(10))
    );
}

// ==================== Concurrency ====================

#[tokio::test]
async fn concurrent_deposits_to_distinct_keys_all_succeed() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;
    for _ in 0..4 {
        backend.oracle.push_name("banana peel");
        backend.oracle.push_fill(percent(50));
    }

    let mut tasks = Vec::new();
    for category in 1..=4u8 {
        let client = client_for(backend.addr);
        tasks.push(tokio::spawn(async move {
            client.deposit(&format!("/trash/ABCDE_{category}.jpg")).await
        }));
    }

    for task in tasks {
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.category, Some(Category::new(3).unwrap()));
        assert_eq!(report.storage, Some(percent(50)));
    }
    for category in 1..=4 {
        assert_eq!(
            backend.store.get_storage(&key("ABCDE", category)).unwrap(),
            Some(percent(50))
        );
    }
}

#[tokio::test]
async fn concurrent_deposits_to_same_key_leave_one_written_value() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;
    let fills: Vec<u8> = vec![20, 30, 40, 60, 90];
    for &fill in &fills {
        backend.oracle.push_name("banana peel");
        backend.oracle.push_fill(percent(fill));
    }

    let mut tasks = Vec::new();
    for _ in 0..fills.len() {
        let client = client_for(backend.addr);
        tasks.push(tokio::spawn(
            async move { client.deposit("/trash/ABCDE_3.jpg").await },
        ));
    }
    for task in tasks {
        let report = task.await.unwrap().unwrap();
        let storage = report.storage.unwrap();
        assert!(fills.contains(&storage.value()));
    }

    let last = backend
        .store
        .get_storage(&key("ABCDE", 3))
        .unwrap()
        .unwrap();
    assert!(fills.contains(&last.value()), "store holds {last}");
}

// ==================== Server lifecycle ====================

#[tokio::test]
async fn oversize_request_line_aborts_only_that_session() {
    let backend = start_server(ProtocolVariant::SinglePhase, ConsistencyMode::Lenient).await;

    // First connection: a line beyond the server's limit kills the
    // session without a reply.
    let mut stream = raw_connect(backend.addr).await;
    let long_line = format!("/trash/{}_3.jpg", "A".repeat(4000));
    stream.send(long_line).await.unwrap();
    assert!(stream.next().await.is_none());

    // The acceptor is still alive for the next exchange.
    backend.oracle.push_name("banana peel");
    backend.oracle.push_fill(percent(25));
    let report = client_for(backend.addr)
        .deposit("/trash/ABCDE_3.jpg")
        .await
        .unwrap();
    assert_eq!(report.storage, Some(percent(25)));
}

#[tokio::test]
async fn silent_peer_is_timed_out() {
    let store = Arc::new(MemoryBinStore::new());
    let oracle = Arc::new(ScriptedOracle::new());
    let services = ExchangeServices {
        store: Arc::clone(&store) as Arc<dyn BinStore>,
        gateway: Arc::new(knowledge()),
        oracle: Arc::clone(&oracle) as Arc<dyn skep_server::VisionOracle>,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig::new(addr, ProtocolVariant::SinglePhase)
        .with_receive_timeout(Duration::from_millis(100));
    let mut server = ExchangeServer::new(config, services);
    tokio::spawn(async move { server.run(listener).await.unwrap() });

    let mut stream = raw_connect(addr).await;
    // Send nothing; the server closes once its receive window lapses.
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn connection_cap_rejects_before_the_exchange() {
    let store = Arc::new(MemoryBinStore::new());
    let oracle = Arc::new(ScriptedOracle::new());
    let services = ExchangeServices {
        store: Arc::clone(&store) as Arc<dyn BinStore>,
        gateway: Arc::new(knowledge()),
        oracle: Arc::clone(&oracle) as Arc<dyn skep_server::VisionOracle>,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config =
        ServerConfig::new(addr, ProtocolVariant::SinglePhase).with_max_connections(0);
    let mut server = ExchangeServer::new(config, services);
    tokio::spawn(async move { server.run(listener).await.unwrap() });

    let err = client_for(addr)
        .deposit("/trash/ABCDE_3.jpg")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::ConnectionClosed | ClientError::Transport(_) | ClientError::Timeout(_)
    ));
}

#[tokio::test]
async fn shutdown_handle_stops_the_acceptor() {
    let store = Arc::new(MemoryBinStore::new());
    let oracle = Arc::new(ScriptedOracle::new());
    let services = ExchangeServices {
        store: Arc::clone(&store) as Arc<dyn BinStore>,
        gateway: Arc::new(knowledge()),
        oracle: Arc::clone(&oracle) as Arc<dyn skep_server::VisionOracle>,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ServerConfig::default();
    let mut server = ExchangeServer::new(config, services);
    let handle = server.shutdown_handle();

    let task = tokio::spawn(async move { server.run(listener).await });
    handle.shutdown().await;

    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
