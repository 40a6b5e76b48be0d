/// End-to-end tests for the chat server over real TCP connections.
///
/// Each test binds its own server on an ephemeral port, so tests can run
/// in parallel.
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use group_chat::{AppError, Config, Registry, Server};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    registry: Registry,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), AppError>>,
}

async fn start_server(idle_timeout_secs: u64) -> TestServer {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        idle_timeout_secs,
        ..Config::default()
    };
    let server = Server::bind(config).await.unwrap();
    TestServer {
        addr: server.local_addr().unwrap(),
        registry: server.registry(),
        shutdown: server.shutdown_token(),
        task: tokio::spawn(server.run()),
    }
}

struct Client {
    /// Server-side id: our local address
    id: String,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect and wait for our own login announcement
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let id = stream.local_addr().unwrap().to_string();
        let (read_half, writer) = stream.into_split();
        let mut client = Self {
            id,
            lines: BufReader::new(read_half).lines(),
            writer,
        };
        let login = format!("[{0}]:[{0}] ===> login!!", client.id);
        client.expect(&login).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.send_raw(format!("{}\n", line).as_bytes()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn next_line(&mut self) -> Option<String> {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    /// Skip lines until `wanted` arrives
    async fn expect(&mut self, wanted: &str) {
        loop {
            match self.next_line().await {
                Some(line) if line == wanted => return,
                Some(_) => continue,
                None => panic!("connection closed before {:?}", wanted),
            }
        }
    }

    /// Read until the server closes the connection
    async fn expect_closed(&mut self) {
        while self.next_line().await.is_some() {}
    }
}

#[tokio::test]
async fn test_three_user_scenario() {
    let server = start_server(60).await;
    let mut a = Client::connect(server.addr).await;
    let mut b = Client::connect(server.addr).await;
    let mut c = Client::connect(server.addr).await;

    a.send("hello").await;
    let hello = format!("[{0}]:[{0}] ===> hello", a.id);
    b.expect(&hello).await;
    c.expect(&hello).await;
    // The sender gets its own echo
    a.expect(&hello).await;

    b.send("\\rename|Bob").await;
    b.expect("rename successfully!").await;

    b.send("hi all").await;
    let hi = format!("[{}]:[Bob] ===> hi all", b.id);
    a.expect(&hi).await;
    c.expect(&hi).await;

    a.send("\\who").await;
    let mut roster = HashSet::new();
    for _ in 0..3 {
        roster.insert(a.next_line().await.unwrap());
    }
    let expected: HashSet<String> = [
        format!("id:{0}, name:{0}", a.id),
        format!("id:{}, name:Bob", b.id),
        format!("id:{0}, name:{0}", c.id),
    ]
    .into_iter()
    .collect();
    assert_eq!(roster, expected);

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_who_lists_self() {
    let server = start_server(60).await;
    let mut a = Client::connect(server.addr).await;

    a.send("\\who").await;
    assert_eq!(
        a.next_line().await,
        Some(format!("id:{0}, name:{0}", a.id))
    );

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_client_close_logs_out_immediately() {
    let server = start_server(60).await;
    let mut a = Client::connect(server.addr).await;
    let mut b = Client::connect(server.addr).await;

    b.send("\\rename|Bob").await;
    b.expect("rename successfully!").await;
    b.writer.shutdown().await.unwrap();

    a.expect("Bob exit already!").await;
    assert_eq!(server.registry.len(), 1);
    b.expect_closed().await;

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_idle_user_is_evicted() {
    let server = start_server(1).await;
    let mut a = Client::connect(server.addr).await;
    let mut b = Client::connect(server.addr).await;
    let timed_out = format!("{} timeout exit already!", b.id);

    // A stays active, B stays silent
    let seen = timeout(WAIT, async {
        loop {
            a.send("ping").await;
            let line = a.next_line().await.unwrap();
            if line == timed_out {
                return;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await;
    assert!(seen.is_ok(), "no timeout logout observed");

    assert_eq!(server.registry.len(), 1);
    b.expect_closed().await;

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_partial_and_combined_writes_are_framed() {
    let server = start_server(60).await;
    let mut a = Client::connect(server.addr).await;
    let mut b = Client::connect(server.addr).await;

    a.send_raw(b"one\ntwo\n").await;
    a.send_raw(b"thr").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    a.send_raw(b"ee\n").await;

    for text in ["one", "two", "three"] {
        b.expect(&format!("[{0}]:[{0}] ===> {1}", a.id, text)).await;
    }

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_rename_only_answers_sender() {
    let server = start_server(60).await;
    let mut a = Client::connect(server.addr).await;
    let mut b = Client::connect(server.addr).await;
    a.expect(&format!("[{0}]:[{0}] ===> login!!", b.id)).await;

    a.send("\\rename|x").await;
    let reply = a.next_line().await.unwrap();
    assert!(reply.starts_with("error: malformed rename"), "{}", reply);

    // B sees nothing from the failed rename, only the next chat
    a.send("after").await;
    assert_eq!(
        b.next_line().await,
        Some(format!("[{0}]:[{0}] ===> after", a.id))
    );

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_every_connection() {
    let server = start_server(60).await;
    let mut a = Client::connect(server.addr).await;
    let mut b = Client::connect(server.addr).await;

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();

    a.expect_closed().await;
    b.expect_closed().await;
    assert!(server.registry.is_empty());
}
