use super::types::{CONTENT_LENGTH, CONTENT_TYPE, FORM_MIME_TYPE, Header, Limits, Request};

/// Outcome of feeding one byte to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The byte completed a valid request.
    Accepted,
    /// The byte cannot continue a valid request. Terminal until `reset`.
    Rejected,
    NeedMoreData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    MethodStart,
    Method,
    UriStart,
    Uri,
    VersionH,
    VersionT1,
    VersionT2,
    VersionP,
    VersionSlash,
    MajorStart,
    Major,
    MinorStart,
    Minor,
    RequestLineLf,
    HeaderLineStart,
    HeaderLws,
    HeaderName,
    SpaceBeforeValue,
    HeaderValue,
    HeaderLineLf,
    HeadersEndLf,
    Body,
    Done,
}

/// Byte-at-a-time HTTP/1.0 request decoder.
///
/// Nothing is buffered beyond the `Request` under construction: each byte is
/// classified against the current state and either appended to a field,
/// used to advance the machine, or rejected.
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    remaining: usize,
    head_bytes: usize,
    limits: Limits,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            state: State::MethodStart,
            remaining: 0,
            head_bytes: 0,
            limits,
        }
    }

    pub fn reset(&mut self) {
        self.state = State::MethodStart;
        self.remaining = 0;
        self.head_bytes = 0;
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Feeds `bytes` until the request completes or is rejected.
    ///
    /// Returns the status of the last byte consumed and how many bytes were
    /// consumed; bytes after a terminal status are left to the caller.
    pub fn parse(&mut self, request: &mut Request, bytes: &[u8]) -> (ParseStatus, usize) {
        for (index, &byte) in bytes.iter().enumerate() {
            match self.consume(request, byte) {
                ParseStatus::NeedMoreData => continue,
                status => return (status, index + 1),
            }
        }
        (ParseStatus::NeedMoreData, bytes.len())
    }

    pub fn consume(&mut self, request: &mut Request, input: u8) -> ParseStatus {
        if !matches!(self.state, State::Body | State::Done) {
            self.head_bytes += 1;
            if self.head_bytes > self.limits.max_header_bytes {
                return self.reject();
            }
        }

        match self.state {
            State::MethodStart => {
                if !is_token(input) {
                    return self.reject();
                }
                request.method.push(input as char);
                self.advance(State::Method)
            }
            State::Method => {
                if input == b' ' {
                    return self.advance(State::UriStart);
                }
                if !is_token(input) {
                    return self.reject();
                }
                request.method.push(input as char);
                ParseStatus::NeedMoreData
            }
            State::UriStart => {
                if !is_uri_char(input) {
                    return self.reject();
                }
                request.uri.push(input as char);
                self.advance(State::Uri)
            }
            State::Uri => {
                if input == b' ' {
                    return self.advance(State::VersionH);
                }
                if !is_uri_char(input) {
                    return self.reject();
                }
                request.uri.push(input as char);
                ParseStatus::NeedMoreData
            }
            State::VersionH => self.expect(input, b'H', State::VersionT1),
            State::VersionT1 => self.expect(input, b'T', State::VersionT2),
            State::VersionT2 => self.expect(input, b'T', State::VersionP),
            State::VersionP => self.expect(input, b'P', State::VersionSlash),
            State::VersionSlash => {
                request.version_major = 0;
                request.version_minor = 0;
                self.expect(input, b'/', State::MajorStart)
            }
            State::MajorStart | State::Major => {
                if input == b'.' && self.state == State::Major {
                    return self.advance(State::MinorStart);
                }
                match push_digit(request.version_major, input) {
                    Some(value) => {
                        request.version_major = value;
                        self.advance(State::Major)
                    }
                    None => self.reject(),
                }
            }
            State::MinorStart | State::Minor => {
                if input == b'\r' && self.state == State::Minor {
                    return self.advance(State::RequestLineLf);
                }
                match push_digit(request.version_minor, input) {
                    Some(value) => {
                        request.version_minor = value;
                        self.advance(State::Minor)
                    }
                    None => self.reject(),
                }
            }
            State::RequestLineLf => self.expect(input, b'\n', State::HeaderLineStart),
            State::HeaderLineStart => {
                if input == b'\r' {
                    return self.advance(State::HeadersEndLf);
                }
                if !request.headers.is_empty() && (input == b' ' || input == b'\t') {
                    return self.advance(State::HeaderLws);
                }
                if !is_token(input) {
                    return self.reject();
                }
                request
                    .headers
                    .push(Header::new((input as char).to_string(), String::new()));
                self.advance(State::HeaderName)
            }
            State::HeaderLws => {
                if input == b'\r' {
                    return self.advance(State::HeaderLineLf);
                }
                if input == b' ' || input == b'\t' {
                    return ParseStatus::NeedMoreData;
                }
                if !is_value_char(input) {
                    return self.reject();
                }
                // Guarded by the non-empty check that led here.
                let Some(header) = request.headers.last_mut() else {
                    return self.reject();
                };
                if !header.value.is_empty() {
                    header.value.push(' ');
                }
                header.value.push(input as char);
                self.advance(State::HeaderValue)
            }
            State::HeaderName => {
                if input == b':' {
                    return self.advance(State::SpaceBeforeValue);
                }
                if !is_token(input) {
                    return self.reject();
                }
                match request.headers.last_mut() {
                    Some(header) => header.name.push(input as char),
                    None => return self.reject(),
                }
                ParseStatus::NeedMoreData
            }
            State::SpaceBeforeValue => self.expect(input, b' ', State::HeaderValue),
            State::HeaderValue => {
                if input == b'\r' {
                    return self.advance(State::HeaderLineLf);
                }
                if !is_value_char(input) {
                    return self.reject();
                }
                match request.headers.last_mut() {
                    Some(header) => header.value.push(input as char),
                    None => return self.reject(),
                }
                ParseStatus::NeedMoreData
            }
            State::HeaderLineLf => self.expect(input, b'\n', State::HeaderLineStart),
            State::HeadersEndLf => {
                if input != b'\n' {
                    return self.reject();
                }
                self.finish_headers(request)
            }
            State::Body => {
                if self.remaining == 0 {
                    return self.reject();
                }
                request.body.push(input);
                self.remaining -= 1;
                if self.remaining == 0 {
                    return self.accept();
                }
                ParseStatus::NeedMoreData
            }
            State::Done => ParseStatus::Rejected,
        }
    }

    fn finish_headers(&mut self, request: &mut Request) -> ParseStatus {
        let mut content_length = 0usize;
        for header in &request.headers {
            if header.name.eq_ignore_ascii_case(CONTENT_LENGTH) {
                match header.value.parse::<usize>() {
                    Ok(length) => content_length = length,
                    Err(_) => return self.reject(),
                }
            } else if header.name.eq_ignore_ascii_case(CONTENT_TYPE)
                && !header.value.eq_ignore_ascii_case(FORM_MIME_TYPE)
            {
                return self.reject();
            }
        }

        if content_length == 0 {
            return self.accept();
        }
        if content_length > self.limits.max_body_bytes {
            return self.reject();
        }

        self.remaining = content_length;
        request.body.reserve(content_length);
        self.advance(State::Body)
    }

    fn expect(&mut self, input: u8, wanted: u8, next: State) -> ParseStatus {
        if input == wanted {
            self.advance(next)
        } else {
            self.reject()
        }
    }

    fn advance(&mut self, next: State) -> ParseStatus {
        self.state = next;
        ParseStatus::NeedMoreData
    }

    fn accept(&mut self) -> ParseStatus {
        self.state = State::Done;
        ParseStatus::Accepted
    }

    fn reject(&mut self) -> ParseStatus {
        self.state = State::Done;
        ParseStatus::Rejected
    }
}

fn push_digit(current: u32, input: u8) -> Option<u32> {
    if !input.is_ascii_digit() {
        return None;
    }
    current.checked_mul(10)?.checked_add(u32::from(input - b'0'))
}

fn is_ctl(c: u8) -> bool {
    c <= 31 || c == 127
}

fn is_tspecial(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
            | b'{'
            | b'}'
            | b' '
            | b'\t'
    )
}

fn is_token(c: u8) -> bool {
    c.is_ascii() && !is_ctl(c) && !is_tspecial(c)
}

fn is_uri_char(c: u8) -> bool {
    c.is_ascii() && !is_ctl(c) && c != b' '
}

fn is_value_char(c: u8) -> bool {
    c.is_ascii() && !is_ctl(c)
}
