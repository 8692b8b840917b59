mod http1;

pub use http1::{
    CONTENT_LENGTH, CONTENT_TYPE, FORM_MIME_TYPE, Header, Limits, ParseStatus, PathError, Reply,
    Request, RequestParser, SERVER_NAME, StatusCode, decode_path, encode_reply, status_line,
    url_decode, write_reply,
};
