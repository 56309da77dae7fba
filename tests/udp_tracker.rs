//! End-to-end tests for the UDP tracker: a real socket client runs the
//! connect handshake, announces and scrapes against a running server.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use goat_tracker::bootstrap::jobs::udp_tracker;
use goat_tracker::config::Configuration;
use goat_tracker::core::databases::sqlite::Sqlite;
use goat_tracker::core::databases::Database;
use goat_tracker::core::Tracker;
use goat_tracker::servers::signals::Halted;
use goat_tracker::servers::udp::request::{AnnounceRequest, ConnectRequest, ScrapeRequest};
use goat_tracker::servers::udp::responses::Response;
use goat_tracker::servers::udp::PROTOCOL_ID;
use goat_tracker::shared::bit_torrent::info_hash::InfoHash;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn ephemeral_tracker() -> Arc<Tracker> {
    static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

    let path = std::env::temp_dir().join(format!(
        "goat-tracker-e2e-udp-{}-{}.db",
        std::process::id(),
        NEXT_DB.fetch_add(1, Ordering::Relaxed)
    ));
    let _ = std::fs::remove_file(&path);

    let database = Sqlite::new(path.to_str().unwrap()).unwrap();
    database.create_database_tables().unwrap();

    Arc::new(Tracker::with_database(
        Arc::new(Configuration::default()),
        Arc::new(Box::new(database) as Box<dyn Database>),
    ))
}

struct TestEnvironment {
    tracker: Arc<Tracker>,
    server_addr: SocketAddr,
    _task: JoinHandle<()>,
    _halt: oneshot::Sender<Halted>,
}

async fn start_test_tracker() -> TestEnvironment {
    let tracker = ephemeral_tracker();

    let (server_addr, task, halt) = udp_tracker::start_job("127.0.0.1:0".parse().unwrap(), tracker.clone()).await;

    TestEnvironment {
        tracker,
        server_addr,
        _task: task,
        _halt: halt,
    }
}

struct Client {
    socket: UdpSocket,
}

impl Client {
    async fn connected_to(server_addr: SocketAddr) -> Client {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(server_addr).await.unwrap();
        Client { socket }
    }

    async fn exchange(&self, packet: &[u8]) -> Response {
        self.socket.send(packet).await.unwrap();

        let mut buffer = [0u8; 2048];
        let received = tokio::time::timeout(Duration::from_secs(5), self.socket.recv(&mut buffer))
            .await
            .expect("no response from the tracker")
            .unwrap();

        Response::from_bytes(&buffer[..received]).unwrap()
    }

    async fn handshake(&self) -> u64 {
        let connect = ConnectRequest {
            connection_id: PROTOCOL_ID,
            transaction_id: 0x0102_0304,
        };

        match self.exchange(&connect.to_bytes()).await {
            Response::Connect {
                transaction_id,
                connection_id,
            } => {
                assert_eq!(transaction_id, 0x0102_0304);
                assert!((1..=1_000_000_000).contains(&connection_id));
                connection_id
            }
            other => panic!("expected a connect response, got {other:?}"),
        }
    }
}

fn sample_announce(connection_id: u64) -> AnnounceRequest {
    AnnounceRequest {
        connection_id,
        transaction_id: 0x0506_0708,
        info_hash: InfoHash([0xde; 20]),
        peer_id: *b"-qB00000000000000001",
        downloaded: 0,
        left: 0,
        uploaded: 0,
        event: 2, // started
        ip: 0,
        key: 0,
        numwant: u32::MAX,
        port: 6881,
    }
}

#[tokio::test]
async fn it_should_handshake_and_accept_the_connection_id_exactly_once() {
    let env = start_test_tracker().await;
    let client = Client::connected_to(env.server_addr).await;

    let connection_id = client.handshake().await;

    let announce = sample_announce(connection_id);

    match client.exchange(&announce.to_bytes()).await {
        Response::Announce {
            transaction_id,
            interval,
            leechers,
            seeders,
            peers,
        } => {
            assert_eq!(transaction_id, 0x0506_0708);
            assert_eq!(interval, env.tracker.config().interval);
            assert_eq!(leechers, 0);
            assert_eq!(seeders, 1);
            // The sender's own address is excluded from the peer list.
            assert!(peers.is_empty());
        }
        other => panic!("expected an announce response, got {other:?}"),
    }

    // Reusing the spent connection id requires a new handshake.
    match client.exchange(&announce.to_bytes()).await {
        Response::Error {
            transaction_id,
            message,
        } => {
            assert_eq!(transaction_id, 0x0506_0708);
            assert_eq!(message, "Client must properly handshake before announce");
        }
        other => panic!("expected an error response, got {other:?}"),
    }
}

#[tokio::test]
async fn it_should_reject_announces_without_a_prior_handshake() {
    let env = start_test_tracker().await;
    let client = Client::connected_to(env.server_addr).await;

    let announce = sample_announce(42);

    match client.exchange(&announce.to_bytes()).await {
        Response::Error { message, .. } => {
            assert_eq!(message, "Client must properly handshake before announce");
        }
        other => panic!("expected an error response, got {other:?}"),
    }
}

#[tokio::test]
async fn it_should_answer_unknown_actions_with_an_error() {
    let env = start_test_tracker().await;
    let client = Client::connected_to(env.server_addr).await;

    let mut packet = vec![0u8; 16];
    packet[8..12].copy_from_slice(&9u32.to_be_bytes());
    packet[12..16].copy_from_slice(&7u32.to_be_bytes());

    match client.exchange(&packet).await {
        Response::Error {
            transaction_id,
            message,
        } => {
            assert_eq!(transaction_id, 7);
            assert_eq!(message, "Invalid action");
        }
        other => panic!("expected an error response, got {other:?}"),
    }
}

#[tokio::test]
async fn it_should_scrape_after_a_fresh_handshake() {
    let env = start_test_tracker().await;
    let client = Client::connected_to(env.server_addr).await;

    // Register one seeder.
    let connection_id = client.handshake().await;
    client.exchange(&sample_announce(connection_id).to_bytes()).await;

    // Scrape needs its own handshake: connection ids are single use.
    let connection_id = client.handshake().await;

    let scrape = ScrapeRequest {
        connection_id,
        transaction_id: 11,
        info_hashes: vec![InfoHash([0xde; 20]), InfoHash([0x42; 20])],
    };

    match client.exchange(&scrape.to_bytes()).await {
        Response::Scrape { transaction_id, files } => {
            assert_eq!(transaction_id, 11);
            assert_eq!(files.len(), 2);
            assert_eq!(files[0].seeders, 1);
            assert_eq!(files[0].completed, 0);
            assert_eq!(files[0].leechers, 0);
            assert_eq!(files[1].seeders, 0);
        }
        other => panic!("expected a scrape response, got {other:?}"),
    }
}

#[tokio::test]
async fn peers_behind_the_same_ip_share_one_swarm_record() {
    let env = start_test_tracker().await;

    let alice = Client::connected_to(env.server_addr).await;
    let connection_id = alice.handshake().await;
    alice.exchange(&sample_announce(connection_id).to_bytes()).await;

    let bob = Client::connected_to(env.server_addr).await;
    let connection_id = bob.handshake().await;

    match bob.exchange(&sample_announce(connection_id).to_bytes()).await {
        Response::Announce { peers, seeders, .. } => {
            // Both clients announce anonymously from 127.0.0.1, and the
            // swarm key is (file, user, ip): they collapse into one record
            // with the port of the later announcer.
            assert_eq!(seeders, 1);
            assert!(peers.is_empty());
        }
        other => panic!("expected an announce response, got {other:?}"),
    }

    // A peer on another address sees the shared record.
    let info_hash = InfoHash([0xde; 20]).to_hex_string();
    let blob = env
        .tracker
        .database
        .compact_peer_list(&info_hash, "10.0.0.9", 50)
        .await
        .unwrap();
    assert_eq!(blob.len(), 6);
}
