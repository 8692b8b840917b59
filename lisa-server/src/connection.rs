use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use lisa_net::{Limits, ParseStatus, Reply, Request, RequestParser, StatusCode, encode_reply};
use lisa_storage::QueueSession;

use crate::config::ServerConfig;
use crate::handler::RequestHandler;

const READ_BUFFER_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// A request was parsed and answered with this status.
    Replied(StatusCode),
    /// The parser rejected the bytes; a 400 was written.
    Rejected,
    /// The peer closed before a request completed.
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub limits: Limits,
}

impl ConnectionSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            read_timeout: config.connection.read_timeout(),
            write_timeout: config.connection.write_timeout(),
            limits: config.parser_limits(),
        }
    }

    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)?;
        stream.set_nodelay(true)
    }
}

/// Reads one request from `stream`, answers it and returns. HTTP/1.0: the
/// caller closes the connection afterwards.
pub fn serve_connection<T: Read + Write>(
    stream: &mut T,
    handler: &RequestHandler,
    session: &mut dyn QueueSession,
    limits: Limits,
) -> io::Result<ConnectionOutcome> {
    let mut parser = RequestParser::with_limits(limits);
    let mut request = Request::default();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        let read = match stream.read(&mut buffer) {
            Ok(0) => return Ok(ConnectionOutcome::Closed),
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        match parser.parse(&mut request, &buffer[..read]).0 {
            ParseStatus::NeedMoreData => continue,
            ParseStatus::Accepted => {
                let reply = handler.handle_request(&request, session);
                write_all(stream, &reply)?;
                return Ok(ConnectionOutcome::Replied(reply.status));
            }
            ParseStatus::Rejected => {
                write_all(stream, &Reply::stock(StatusCode::BadRequest))?;
                return Ok(ConnectionOutcome::Rejected);
            }
        }
    }
}

fn write_all<T: Write>(stream: &mut T, reply: &Reply) -> io::Result<()> {
    stream.write_all(&encode_reply(reply))?;
    stream.flush()
}
