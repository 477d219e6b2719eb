//! The request/response projection structs and the per-session parse state
//! slot. Plain structs exposing the fields the codec needs, with no hidden
//! machinery; `Request`/`Response` are owned, built once per AJP13
//! round-trip and handed to `request::emit_request_chunk`.

use decoder::ParseState;
use enums::method::Method;

/// The fields the FORWARD_REQUEST encoder reads off an HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub protocol: String,
    pub uri: String,
    pub remote_addr: String,
    pub server_name: Option<String>,
    /// The bound socket's own IP literal — the server-name fallback a proxy
    /// core fills in when the inbound request carried no `Host`.
    pub local_addr: String,
    pub server_port: u16,
    pub is_ssl: bool,
    pub remote_user: Option<String>,
    pub query_string: Option<String>,
    pub jvm_route: Option<String>,
    pub content_length: u64,
    /// Duplicates allowed; order need not be preserved.
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, protocol: &str, uri: &str, remote_addr: &str) -> Request {
        Request {
            method: method,
            protocol: protocol.to_string(),
            uri: uri.to_string(),
            remote_addr: remote_addr.to_string(),
            server_name: None,
            local_addr: String::new(),
            server_port: 80,
            is_ssl: false,
            remote_user: None,
            query_string: None,
            jvm_route: None,
            content_length: 0,
            headers: Vec::new(),
        }
    }
}

/// The fields the response decoder populates. AJP13 never carries an HTTP
/// version on the response side, hence no `version` field here.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: Option<u16>,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn new() -> Response {
        Response::default()
    }
}

/// One AJP13-bound proxy session: the request/response projections, the
/// codec's own resumable parse state, and the bits of connection identity
/// the codec reads (`is_closing`, the JVM-route hint of the upstream
/// connection it's bound to).
#[derive(Debug)]
pub struct Session {
    pub request: Request,
    pub response: Response,
    pub parse_state: ParseState,
    pub is_closing: bool,
}

impl Session {
    pub fn new(request: Request) -> Session {
        Session {
            request: request,
            response: Response::new(),
            parse_state: ParseState::new(),
            is_closing: false,
        }
    }
}
