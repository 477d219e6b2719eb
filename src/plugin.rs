//! The protocol-plugin surface: a small trait vtable a proxy core registers
//! a named protocol handler against, plus the `ajp13` handler itself and a
//! trivial hello-world module exercising the same trait.

pub mod helloworld;

use decoder::{self, ParseState, Progress};
use error::Result;
use queue::ChunkQueue;
use request;
use session::{Request, Response};

/// The six callbacks a backend protocol plugs into the core with.
pub trait Protocol {
    /// Human-readable name this protocol is registered under.
    fn name(&self) -> &'static str;

    /// Called once when a plugin is loaded.
    fn stream_init(&self) {}

    /// Called once when a plugin is unloaded.
    fn stream_cleanup(&self) {}

    /// Frames `request`'s headers as a `FORWARD_REQUEST` packet onto
    /// `out_queue`.
    fn get_request_chunk(&self, request: &Request, out_queue: &mut ChunkQueue);

    /// Frames whatever's buffered in `in_queue` as backend-bound body
    /// packets onto `out_queue`.
    fn stream_encoder(&self, in_queue: &mut ChunkQueue, out_queue: &mut ChunkQueue);

    /// Advances `state` by one packet using bytes buffered in `in_queue`,
    /// writing any forwardable response body to `out_queue` and updating
    /// `response` as headers arrive.
    fn stream_decoder(&self, state: &mut ParseState, in_queue: &mut ChunkQueue,
        out_queue: &mut ChunkQueue, response: &mut Response, is_closing: &mut bool)
        -> Result<Progress>;

    /// Decodes packets from `in_queue` until the response's status line is
    /// known (or input runs out).
    fn parse_response_header(&self, state: &mut ParseState, in_queue: &mut ChunkQueue,
        out_queue: &mut ChunkQueue, response: &mut Response, is_closing: &mut bool)
        -> Result<decoder::HeaderProgress>;
}

/// The protocol this crate actually implements.
pub struct Ajp13Protocol;

impl Protocol for Ajp13Protocol {
    fn name(&self) -> &'static str {
        "ajp13"
    }

    fn get_request_chunk(&self, request: &Request, out_queue: &mut ChunkQueue) {
        request::emit_request_chunk(request, out_queue);
    }

    fn stream_encoder(&self, in_queue: &mut ChunkQueue, out_queue: &mut ChunkQueue) {
        request::emit_request_body(in_queue, out_queue);
    }

    fn stream_decoder(&self, state: &mut ParseState, in_queue: &mut ChunkQueue,
        out_queue: &mut ChunkQueue, response: &mut Response, is_closing: &mut bool)
        -> Result<Progress>
    {
        decoder::decode_loop(state, in_queue, out_queue, response, is_closing)
    }

    fn parse_response_header(&self, state: &mut ParseState, in_queue: &mut ChunkQueue,
        out_queue: &mut ChunkQueue, response: &mut Response, is_closing: &mut bool)
        -> Result<decoder::HeaderProgress>
    {
        decoder::parse_response_header(state, in_queue, out_queue, response, is_closing)
    }
}

/// A named slot a `Protocol` trait object is registered into. A proxy core
/// embedding this crate owns a `Registry` and looks protocols up by name at
/// configuration time; this crate only needs the one `ajp13` entry, but the
/// registration point is kept generic so other backend protocols (and the
/// `helloworld` demo module) can share it.
#[derive(Default)]
pub struct Registry {
    protocols: Vec<Box<Protocol>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry { protocols: Vec::new() }
    }

    /// Registers `protocol`, calling its `stream_init` hook immediately.
    pub fn register_protocol(&mut self, protocol: Box<Protocol>) {
        protocol.stream_init();
        self.protocols.push(protocol);
    }

    pub fn find(&self, name: &str) -> Option<&Protocol> {
        self.protocols.iter()
            .find(|p| p.name() == name)
            .map(|p| &**p)
    }
}
