use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use lisa_storage::{ConnectionPool, QueueSession};

use crate::config::ServerConfig;
use crate::connection::{ConnectionOutcome, ConnectionSettings, serve_connection};
use crate::error::ServerError;
use crate::handler::RequestHandler;
use crate::logger::Logger;
use crate::queue::QueueProcessor;
use crate::router::Router;

/// Accepted connections waiting for a free worker, per worker.
const BACKLOG_PER_WORKER: usize = 4;

/// The queue server: one acceptor plus a fixed pool of worker threads, each
/// bound for its whole life to one session from the pool.
pub struct Server<S> {
    listener: TcpListener,
    pool: ConnectionPool<S>,
    handler: RequestHandler,
    settings: ConnectionSettings,
    logger: Arc<dyn Logger>,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running server from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
    logger: Arc<dyn Logger>,
}

impl ShutdownHandle {
    /// Stops accepting; workers finish their current connection and exit.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        // Unblock the acceptor so it observes the flag.
        if let Err(err) = TcpStream::connect(self.wake_addr) {
            self.logger
                .warn(&format!("failed to wake acceptor at {}: {err}", self.wake_addr));
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl<S: QueueSession> Server<S> {
    /// Binds the listener. The pool must hold exactly one session per
    /// configured worker.
    pub fn bind(
        config: &ServerConfig,
        pool: ConnectionPool<S>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        if pool.len() != config.workers {
            return Err(ServerError::Config(format!(
                "pool has {} sessions for {} workers",
                pool.len(),
                config.workers
            )));
        }

        let listener = TcpListener::bind(config.listen_addr())?;
        let router = Router::new().with_handler(QueueProcessor::new(Arc::clone(&logger)));

        Ok(Self {
            listener,
            pool,
            handler: RequestHandler::new(router, Arc::clone(&logger)),
            settings: ConnectionSettings::from_config(config),
            logger,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replaces the default router, which only holds the queue processor.
    pub fn with_router(mut self, router: Router) -> Self {
        self.handler = RequestHandler::new(router, Arc::clone(&self.logger));
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> Result<ShutdownHandle, ServerError> {
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr()?),
            logger: Arc::clone(&self.logger),
        })
    }

    /// Serves until [`ShutdownHandle::shutdown`] is called, then waits for
    /// every worker to finish its current connection.
    pub fn run(self) -> Result<(), ServerError> {
        let Self {
            listener,
            mut pool,
            handler,
            settings,
            logger,
            shutdown,
        } = self;

        let addr = listener.local_addr()?;
        let workers = pool.len();
        let (sender, receiver) = bounded(workers * BACKLOG_PER_WORKER);
        logger.info(&format!("lisa listening on {addr} with {workers} workers"));

        thread::scope(|scope| {
            for (worker_id, session) in pool.sessions_mut() {
                let receiver = receiver.clone();
                let handler = &handler;
                let settings = &settings;
                let logger = logger.as_ref();
                scope.spawn(move || {
                    worker_loop(worker_id, receiver, session, handler, settings, logger)
                });
            }
            drop(receiver);

            accept_loop(&listener, &sender, &shutdown, logger.as_ref());
            // Closing the channel lets workers drain and exit.
            drop(sender);
        });

        logger.info("lisa stopped");
        Ok(())
    }
}

fn accept_loop(
    listener: &TcpListener,
    sender: &Sender<TcpStream>,
    shutdown: &AtomicBool,
    logger: &dyn Logger,
) {
    for stream in listener.incoming() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => {
                if sender.send(stream).is_err() {
                    break;
                }
            }
            Err(err) => logger.warn(&format!("accept failed: {err}")),
        }
    }
}

fn worker_loop<S: QueueSession>(
    worker_id: usize,
    receiver: Receiver<TcpStream>,
    session: &mut S,
    handler: &RequestHandler,
    settings: &ConnectionSettings,
    logger: &dyn Logger,
) {
    logger.debug(&format!("worker {worker_id} started"));

    while let Ok(mut stream) = receiver.recv() {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown peer".to_string(), |addr| addr.to_string());
        if let Err(err) = settings.apply(&stream) {
            logger.warn(&format!(
                "worker {worker_id}: failed to configure connection from {peer}: {err}"
            ));
        }

        match serve_connection(&mut stream, handler, session, settings.limits) {
            Ok(ConnectionOutcome::Replied(status)) => logger.debug(&format!(
                "worker {worker_id}: {peer} answered {}",
                status.as_u16()
            )),
            Ok(ConnectionOutcome::Rejected) => {
                logger.debug(&format!("worker {worker_id}: {peer} sent a malformed request"));
            }
            Ok(ConnectionOutcome::Closed) => {
                logger.debug(&format!("worker {worker_id}: {peer} closed before a request"));
            }
            Err(err) => {
                logger.error(&format!("worker {worker_id}: connection error: {err}"));
            }
        }

        let _ = stream.shutdown(Shutdown::Both);
    }

    logger.debug(&format!("worker {worker_id} stopped"));
}

fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

#[cfg(test)]
mod tests {
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::{ShutdownHandle, wake_addr};
    use crate::logger::testing::RecordingLogger;

    #[test]
    fn failed_wake_is_reported_through_the_logger() {
        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let wake = closed.local_addr().unwrap();
        drop(closed);

        let logger = Arc::new(RecordingLogger::default());
        let handle = ShutdownHandle {
            flag: Arc::new(AtomicBool::new(false)),
            wake_addr: wake,
            logger: Arc::clone(&logger) as Arc<dyn crate::Logger>,
        };

        handle.shutdown();
        handle.shutdown();

        assert!(handle.is_shutdown());
        let warnings = logger.messages("warn");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("failed to wake acceptor"));
    }

    #[test]
    fn wakes_through_loopback_for_wildcard_binds() {
        let v4: SocketAddr = "0.0.0.0:1972".parse().unwrap();
        let v6: SocketAddr = "[::]:1972".parse().unwrap();
        let bound: SocketAddr = "10.1.2.3:80".parse().unwrap();

        assert_eq!(wake_addr(v4), "127.0.0.1:1972".parse().unwrap());
        assert_eq!(wake_addr(v6), "[::1]:1972".parse().unwrap());
        assert_eq!(wake_addr(bound), bound);
    }
}
