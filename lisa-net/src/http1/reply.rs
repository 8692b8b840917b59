use std::io::{self, Write};

use super::types::{Reply, StatusCode};

pub const SERVER_NAME: &str = "lisa";

const CRLF: &[u8] = b"\r\n";
const NAME_VALUE_SEPARATOR: &[u8] = b": ";

pub fn status_line(status: StatusCode) -> String {
    format!("HTTP/1.0 {} {}\r\n", status.as_u16(), status.reason())
}

/// Writes the wire form of `reply`: status line, `Server` header, the reply's
/// headers in order, a blank line and the body.
pub fn write_reply<W: Write>(reply: &Reply, out: &mut W) -> io::Result<()> {
    out.write_all(status_line(reply.status).as_bytes())?;
    out.write_all(b"Server")?;
    out.write_all(NAME_VALUE_SEPARATOR)?;
    out.write_all(SERVER_NAME.as_bytes())?;
    out.write_all(CRLF)?;
    for header in &reply.headers {
        out.write_all(header.name.as_bytes())?;
        out.write_all(NAME_VALUE_SEPARATOR)?;
        out.write_all(header.value.as_bytes())?;
        out.write_all(CRLF)?;
    }
    out.write_all(CRLF)?;
    out.write_all(&reply.body)
}

pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut out = Vec::with_capacity(128 + reply.body.len());
    // Writing into a Vec cannot fail.
    let _ = write_reply(reply, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::{encode_reply, status_line};
    use crate::http1::{Header, Reply, StatusCode};

    #[test]
    fn renders_stock_reply() {
        let bytes = encode_reply(&Reply::stock(StatusCode::NotFound));
        assert_eq!(
            bytes,
            b"HTTP/1.0 404 Not Found\r\nServer: lisa\r\nContent-Length: 0\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\n"
        );
    }

    #[test]
    fn renders_headers_in_order_then_body() {
        let reply = Reply {
            status: StatusCode::Ok,
            headers: vec![Header::new("B", "2"), Header::new("A", "1")],
            body: b"payload".to_vec(),
        };
        let text = String::from_utf8(encode_reply(&reply)).unwrap();
        assert_eq!(
            text,
            "HTTP/1.0 200 OK\r\nServer: lisa\r\nB: 2\r\nA: 1\r\n\r\npayload"
        );
    }

    #[test]
    fn unknown_codes_use_internal_error_line() {
        assert_eq!(
            status_line(StatusCode::from_u16(418)),
            "HTTP/1.0 500 Internal Server Error\r\n"
        );
        assert_eq!(
            status_line(StatusCode::from_u16(405)),
            "HTTP/1.0 405 Method Not Allowed\r\n"
        );
    }
}
