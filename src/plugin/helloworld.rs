//! A trivial plugin exercising the registration surface — the simplest
//! possible module, kept around as a demonstration of what a non-AJP13
//! `Protocol` impl looks like rather than anything a real proxy core would
//! load.

use decoder::{self, ParseState, Progress};
use error::Result;
use queue::ChunkQueue;
use session::{Request, Response};
use super::Protocol;

pub struct HelloWorld;

impl Protocol for HelloWorld {
    fn name(&self) -> &'static str {
        "helloworld"
    }

    fn stream_init(&self) {
        info!("Hello World!!!");
    }

    fn get_request_chunk(&self, _request: &Request, _out_queue: &mut ChunkQueue) {
    }

    fn stream_encoder(&self, _in_queue: &mut ChunkQueue, _out_queue: &mut ChunkQueue) {
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_is_helloworld() {
        assert_eq!(HelloWorld.name(), "helloworld");
    }
}
