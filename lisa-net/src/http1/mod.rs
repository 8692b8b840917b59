mod parser;
mod path;
mod reply;
mod types;

pub use parser::{ParseStatus, RequestParser};
pub use path::{PathError, decode_path, url_decode};
pub use reply::{SERVER_NAME, encode_reply, status_line, write_reply};
pub use types::{
    CONTENT_LENGTH, CONTENT_TYPE, FORM_MIME_TYPE, Header, Limits, Reply, Request, StatusCode,
};
