use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use lisa_net::Reply;
use lisa_server::{
    Handler, Outcome, QueueProcessor, RequestContext, Router, Server, ServerConfig, ServerError,
    ShutdownHandle, TracingLogger, finish_content,
};
use lisa_storage::{ConnectionPool, SqliteSession};
use tempfile::TempDir;

struct Running {
    addr: SocketAddr,
    handle: ShutdownHandle,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
    _dir: TempDir,
}

impl Running {
    fn start(workers: usize) -> Self {
        Self::start_with(workers, |server| server)
    }

    fn start_with<F>(workers: usize, configure: F) -> Self
    where
        F: FnOnce(Server<SqliteSession>) -> Server<SqliteSession>,
    {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.listen.host = "127.0.0.1".to_string();
        config.listen.port = 0;
        config.workers = workers;
        config.database.path = dir.path().join("queue.db").to_string_lossy().into_owned();

        let pool =
            ConnectionPool::open_sqlite(&config.database.path, workers, &config.sqlite_config())
                .unwrap();
        let server = configure(Server::bind(&config, pool, Arc::new(TracingLogger)).unwrap());
        let addr = server.local_addr().unwrap();
        let handle = server.shutdown_handle().unwrap();
        let thread = thread::spawn(move || server.run());

        Self {
            addr,
            handle,
            thread: Some(thread),
            _dir: dir,
        }
    }

    fn stop(mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap().unwrap();
        }
    }
}

fn exchange(addr: SocketAddr, raw: &[u8]) -> (u16, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(raw).unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();

    let split = response
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("reply head terminator");
    let head = String::from_utf8(response[..split].to_vec()).unwrap();
    let status = head
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status code");
    assert!(head.starts_with("HTTP/1.0 "), "head {head:?}");
    assert!(head.contains("\r\nServer: lisa"), "head {head:?}");
    (status, response[split + 4..].to_vec())
}

fn get(addr: SocketAddr, path: &str) -> (u16, Vec<u8>) {
    exchange(addr, format!("GET {path} HTTP/1.0\r\n\r\n").as_bytes())
}

fn post(addr: SocketAddr, path: &str, payload: &[u8]) -> (u16, Vec<u8>) {
    let mut raw = format!(
        "POST {path} HTTP/1.0\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\nd=",
        payload.len() + 2
    )
    .into_bytes();
    raw.extend_from_slice(payload);
    exchange(addr, &raw)
}

#[test]
fn serves_queue_over_tcp() {
    let server = Running::start(2);

    assert_eq!(post(server.addr, "/3", b"payload"), (200, Vec::new()));
    assert_eq!(get(server.addr, "/size"), (200, b"1".to_vec()));
    assert_eq!(get(server.addr, "/spy"), (200, b"payload".to_vec()));
    assert_eq!(get(server.addr, "/count"), (200, b"1".to_vec()));
    assert_eq!(get(server.addr, "/"), (200, b"payload".to_vec()));
    assert_eq!(get(server.addr, "/"), (404, Vec::new()));

    server.stop();
}

#[test]
fn answers_errors_with_stock_replies() {
    let server = Running::start(1);

    assert_eq!(exchange(server.addr, b"PUT / HTTP/1.0\r\n\r\n").0, 405);
    assert_eq!(exchange(server.addr, b"\x01\x02 nonsense\r\n\r\n").0, 400);
    assert_eq!(get(server.addr, "/../secret").0, 400);
    assert_eq!(get(server.addr, "/unknown").0, 400);
    assert_eq!(post(server.addr, "/not-a-number", b"x").0, 500);
    assert_eq!(get(server.addr, "/size"), (200, b"0".to_vec()));

    server.stop();
}

/// Answers `/health` and declines everything else.
struct HealthCheck;

impl Handler for HealthCheck {
    fn handle(&self, ctx: &mut RequestContext<'_>, reply: &mut Reply) -> Outcome {
        if ctx.path != "/health" {
            return Outcome::Declined;
        }
        reply.body = b"ok".to_vec();
        finish_content(reply);
        Outcome::Finished
    }
}

#[test]
fn declined_requests_fall_through_to_the_next_handler() {
    let server = Running::start_with(1, |server| {
        server.with_router(
            Router::new()
                .with_handler(HealthCheck)
                .with_handler(QueueProcessor::new(Arc::new(TracingLogger))),
        )
    });

    assert_eq!(get(server.addr, "/health"), (200, b"ok".to_vec()));
    assert_eq!(post(server.addr, "/1", b"routed"), (200, Vec::new()));
    assert_eq!(get(server.addr, "/size"), (200, b"1".to_vec()));
    assert_eq!(get(server.addr, "/"), (200, b"routed".to_vec()));

    server.stop();
}

#[test]
fn router_without_a_match_is_not_implemented() {
    let server = Running::start_with(1, |server| {
        server.with_router(Router::new().with_handler(HealthCheck))
    });

    assert_eq!(get(server.addr, "/health").0, 200);
    assert_eq!(get(server.addr, "/").0, 501);

    server.stop();
}

#[test]
fn concurrent_dequeues_lose_and_duplicate_nothing() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 25;

    let server = Running::start(8);
    let addr = server.addr;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            thread::spawn(move || {
                for item in 0..PER_PRODUCER {
                    let payload = format!("{producer}-{item}");
                    let priority = format!("/{}", item % 3);
                    assert_eq!(post(addr, &priority, payload.as_bytes()).0, 200);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let consumers: Vec<_> = (0..6)
        .map(|_| {
            thread::spawn(move || {
                let mut taken = Vec::new();
                loop {
                    match get(addr, "/") {
                        (200, body) => taken.push(String::from_utf8(body).unwrap()),
                        (404, _) => return taken,
                        (status, _) => panic!("unexpected status {status}"),
                    }
                }
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for consumer in consumers {
        for payload in consumer.join().unwrap() {
            assert!(seen.insert(payload.clone()), "duplicate {payload}");
        }
    }
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert_eq!(get(addr, "/size"), (200, b"0".to_vec()));

    server.stop();
}

#[test]
fn shutdown_stops_the_acceptor() {
    let server = Running::start(3);
    let addr = server.addr;
    assert!(!server.handle.is_shutdown());

    server.stop();

    assert!(get_after_stop(addr));
}

fn get_after_stop(addr: SocketAddr) -> bool {
    match TcpStream::connect(addr) {
        Err(_) => true,
        Ok(mut stream) => {
            let _ = stream.write_all(b"GET /size HTTP/1.0\r\n\r\n");
            let mut response = Vec::new();
            stream.read_to_end(&mut response).is_err() || response.is_empty()
        }
    }
}
