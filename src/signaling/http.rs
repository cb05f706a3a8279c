use std::fmt;
use std::io::{self, Read, Write};

use tungstenite::Error as WsError;
use tungstenite::handshake::server::create_response;
use tungstenite::http::{self, HeaderMap, Method, Request, Response, StatusCode, Version, header};

/// Upper bound on an HTTP request head (request line + headers).
pub const MAX_HEAD_LEN: usize = 16 * 1024;

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 1024;
const TEST_PAGE: &str = include_str!("assets/test_page.html");

#[derive(Debug)]
pub enum HandshakeError {
    Io(io::Error),
    /// Peer closed before sending a complete request head.
    ConnectionClosed,
    TooLarge,
    Parse(httparse::Error),
    /// The head parsed but does not form a valid request.
    Invalid(http::Error),
    Response(WsError),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error during handshake: {e}"),
            Self::ConnectionClosed => write!(f, "connection closed before request was complete"),
            Self::TooLarge => write!(f, "request head exceeds {MAX_HEAD_LEN} bytes"),
            Self::Parse(e) => write!(f, "malformed HTTP request: {e}"),
            Self::Invalid(e) => write!(f, "invalid HTTP request: {e}"),
            Self::Response(e) => write!(f, "cannot build response: {e}"),
        }
    }
}

impl std::error::Error for HandshakeError {}

impl From<io::Error> for HandshakeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<httparse::Error> for HandshakeError {
    fn from(e: httparse::Error) -> Self {
        Self::Parse(e)
    }
}

/// Result of the HTTP exchange that opens every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    /// `101 Switching Protocols` was sent; the stream now speaks WebSocket.
    /// `buffered` holds bytes read past the request head, which belong to
    /// the first WebSocket frames.
    Upgraded { path: String, buffered: Vec<u8> },
    /// A plain HTTP response was sent; the connection should be closed.
    Served { status: u16, path: String },
}

/// Reads one request and answers it.
///
/// WebSocket upgrade requests are validated and answered by tungstenite's
/// server handshake. Anything else is plain HTTP: `GET /` returns the
/// connection-test page when `serve_test_page` is set, everything else
/// `404 Not Found`.
///
/// # Errors
/// [`HandshakeError`] if the request cannot be read or parsed.
pub fn accept<S: Read + Write>(
    stream: &mut S,
    serve_test_page: bool,
) -> Result<HttpOutcome, HandshakeError> {
    let (request, buffered) = read_request(stream)?;
    let path = request.uri().to_string();

    if has_token(request.headers(), header::UPGRADE, "websocket") {
        return match create_response(&request) {
            Ok(response) => {
                write_head(stream, &response)?;
                stream.flush()?;
                Ok(HttpOutcome::Upgraded { path, buffered })
            }
            Err(_) => {
                respond(stream, StatusCode::BAD_REQUEST, "text/plain", "Bad Request")?;
                Ok(HttpOutcome::Served { status: 400, path })
            }
        };
    }

    if serve_test_page && request.method() == Method::GET && request.uri().path() == "/" {
        respond(stream, StatusCode::OK, "text/html; charset=utf-8", TEST_PAGE)?;
        return Ok(HttpOutcome::Served { status: 200, path });
    }

    respond(stream, StatusCode::NOT_FOUND, "text/plain", "Not Found")?;
    Ok(HttpOutcome::Served { status: 404, path })
}

fn has_token(headers: &HeaderMap, name: header::HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
}

fn respond<W: Write>(
    w: &mut W,
    status: StatusCode,
    content_type: &str,
    body: &str,
) -> Result<(), HandshakeError> {
    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::CONNECTION, "close")
        .body(())
        .map_err(|e| HandshakeError::Response(WsError::from(e)))?;

    write_head(w, &response)?;
    w.write_all(body.as_bytes())?;
    w.flush()?;
    Ok(())
}

/// Status line and headers of `response`, terminated by the blank line.
fn write_head<W: Write, T>(w: &mut W, response: &Response<T>) -> io::Result<()> {
    write!(w, "{:?} {}\r\n", response.version(), response.status())?;
    for (name, value) in response.headers() {
        w.write_all(name.as_str().as_bytes())?;
        w.write_all(b": ")?;
        w.write_all(value.as_bytes())?;
        w.write_all(b"\r\n")?;
    }
    w.write_all(b"\r\n")
}

/// Reads until `httparse` sees a complete head.
///
/// Returns the request and any bytes that arrived after the head.
fn read_request<R: Read>(r: &mut R) -> Result<(Request<()>, Vec<u8>), HandshakeError> {
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        if buf.len() >= MAX_HEAD_LEN {
            return Err(HandshakeError::TooLarge);
        }
        match r.read(&mut chunk) {
            Ok(0) => return Err(HandshakeError::ConnectionClosed),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        if let Some((request, head_len)) = parse_head(&buf)? {
            if head_len > MAX_HEAD_LEN {
                return Err(HandshakeError::TooLarge);
            }
            let rest = buf.split_off(head_len);
            return Ok((request, rest));
        }
    }
}

/// `Ok(None)` while the head is still incomplete.
fn parse_head(buf: &[u8]) -> Result<Option<(Request<()>, usize)>, HandshakeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let head_len = match req.parse(buf)? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(None),
    };

    let mut builder = Request::builder()
        .method(req.method.unwrap_or_default())
        .uri(req.path.unwrap_or_default())
        .version(match req.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        });
    for h in req.headers.iter() {
        builder = builder.header(h.name, h.value);
    }
    let request = builder.body(()).map_err(HandshakeError::Invalid)?;

    Ok(Some((request, head_len)))
}
