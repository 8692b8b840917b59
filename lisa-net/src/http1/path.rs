use percent_encoding::percent_decode;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("malformed percent escape at offset {0}")]
    MalformedEscape(usize),
    #[error("decoded path is not valid utf-8")]
    InvalidUtf8,
    #[error("path is empty")]
    Empty,
    #[error("path is not absolute")]
    NotAbsolute,
    #[error("path contains a parent traversal")]
    Traversal,
}

/// Percent-decodes a request URI. `+` decodes to a space; every `%` must be
/// followed by two hex digits.
pub fn url_decode(input: &str) -> Result<String, PathError> {
    let bytes = input.as_bytes();
    let mut plus_decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'%' => {
                let escape = bytes.get(index + 1..index + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return Err(PathError::MalformedEscape(index));
                }
                plus_decoded.extend_from_slice(&bytes[index..index + 3]);
                index += 3;
            }
            b'+' => {
                plus_decoded.push(b' ');
                index += 1;
            }
            other => {
                plus_decoded.push(other);
                index += 1;
            }
        }
    }

    percent_decode(&plus_decoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PathError::InvalidUtf8)
}

/// Decodes `uri` and checks it is a safe absolute path.
pub fn decode_path(uri: &str) -> Result<String, PathError> {
    let path = url_decode(uri)?;
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute);
    }
    if path.contains("..") {
        return Err(PathError::Traversal);
    }
    Ok(path)
}
