//! The response decoder state machine: an explicit, resumable state enum
//! that can suspend mid-packet whenever input runs short and pick back up
//! exactly where it left off on the next call.

use byteorder::{BigEndian, ByteOrder};

use error::{Error, Result};
use queue::ChunkQueue;
use session::Response;
use wire::{Cursor, CONTAINER_MAGIC, FULL_HEADER_LEN};

const GET_BODY_CHUNK: u8 = 0x06;
const SEND_HEADERS: u8 = 0x04;
const SEND_BODY_CHUNK: u8 = 0x03;
const END_RESPONSE: u8 = 0x05;

/// Outcome of a single call to `ParseState::decode_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Input ran out before the in-progress packet could be completed.
    /// Not an error: the caller is expected to call again once more bytes
    /// have arrived.
    NeedMore,
    /// A full packet (other than `END_RESPONSE`) was consumed. The caller
    /// may call `decode_step` again right away if more input is queued.
    PacketDone,
    /// `END_RESPONSE` was consumed; the session is done receiving for this
    /// response.
    StreamDone,
}

/// Outcome of `parse_response_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProgress {
    /// `response.status` has been set by a decoded `SEND_HEADERS` packet.
    Success,
    /// Input ran out before a `SEND_HEADERS` packet was seen.
    NeedMore,
}

/// Sub-phases of `SEND_BODY_CHUNK`'s zero-copy fast path.
#[derive(Debug)]
enum ChunkPhase {
    /// Buffering the 2-byte chunk-length prefix.
    Length { buf: [u8; 2], filled: usize },
    /// Stealing `remaining` bytes straight into the downstream queue;
    /// `padding` is how many trailing bytes to skip once `remaining` hits 0.
    Body { remaining: usize, padding: usize },
    /// Skipping `remaining` padding bytes.
    Padding { remaining: usize },
}

/// What's left to do for the packet currently being parsed.
#[derive(Debug)]
enum Phase {
    /// Accumulating the whole payload (everything but `SEND_BODY_CHUNK`)
    /// before decoding it in one shot.
    Payload(Vec<u8>),
    Chunk(ChunkPhase),
}

#[derive(Debug)]
struct Packet {
    ptype: u8,
    /// Payload bytes remaining after the prefix-code (type) byte.
    length: usize,
    phase: Phase,
}

/// Per-session resumable parse state.
///
/// `0 <= header_filled <= FULL_HEADER_LEN + 1` (the `+1` is the type byte,
/// folded into the same prefix scratch as the 4-byte header since both must
/// be buffered before dispatch can begin). When no packet is in progress,
/// `header_filled == 0` and `packet` is `None`.
#[derive(Debug)]
pub struct ParseState {
    prefix: [u8; FULL_HEADER_LEN + 1],
    prefix_filled: usize,
    packet: Option<Packet>,
}

impl ParseState {
    pub fn new() -> ParseState {
        ParseState {
            prefix: [0; FULL_HEADER_LEN + 1],
            prefix_filled: 0,
            packet: None,
        }
    }

    fn reset(&mut self) {
        self.prefix_filled = 0;
        self.packet = None;
    }

    /// A single step of the decoder.
    pub fn decode_step(&mut self, in_queue: &mut ChunkQueue,
        out_queue: &mut ChunkQueue, response: &mut Response,
        is_closing: &mut bool) -> Result<Progress>
    {
        if self.packet.is_none() {
            if !self.fill_prefix(in_queue)? {
                return Ok(Progress::NeedMore);
            }
        }
        let ptype = self.packet.as_ref().unwrap().ptype;
        match ptype {
            SEND_BODY_CHUNK => self.step_chunk(in_queue, out_queue),
            GET_BODY_CHUNK | SEND_HEADERS | END_RESPONSE => {
                self.step_buffered(in_queue, response, is_closing)
            }
            other => {
                self.reset();
                error!("ajp13: unknown packet type {:#04x}", other);
                Err(Error::UnknownPacketType(other))
            }
        }
    }

    /// Assembles the 4-byte header plus the prefix-code (type) byte that
    /// follows it, and stages a fresh `Packet` once both are in hand.
    /// Returns `false` (meaning `NeedMore`) if input ran out first.
    fn fill_prefix(&mut self, in_queue: &mut ChunkQueue) -> Result<bool> {
        // Fill and validate the 4-byte header first, and only it: a bad
        // magic must be rejected without touching anything past those 4
        // bytes.
        if self.prefix_filled < FULL_HEADER_LEN {
            if !self.drain_prefix(in_queue, FULL_HEADER_LEN) {
                return Ok(false);
            }
            let magic = BigEndian::read_u16(&self.prefix[0..2]);
            if magic != CONTAINER_MAGIC {
                self.reset();
                error!("ajp13: bad magic {:#06x}", magic);
                return Err(Error::BadMagic(magic));
            }
            let declared = BigEndian::read_u16(&self.prefix[2..4]) as i32;
            if declared < 1 {
                self.reset();
                return Err(Error::NegativeLength(declared));
            }
        }
        // Header is valid; now pull the one prefix-code (type) byte that
        // follows it.
        if !self.drain_prefix(in_queue, self.prefix.len()) {
            return Ok(false);
        }
        let declared = BigEndian::read_u16(&self.prefix[2..4]) as i32;
        let ptype = self.prefix[4];
        let length = (declared - 1) as usize;
        self.packet = Some(Packet {
            ptype: ptype,
            length: length,
            phase: if ptype == SEND_BODY_CHUNK {
                Phase::Chunk(ChunkPhase::Length { buf: [0; 2], filled: 0 })
            } else {
                Phase::Payload(Vec::with_capacity(length))
            },
        });
        Ok(true)
    }

    /// Tops `self.prefix` up to `want` bytes (`want` is either
    /// `FULL_HEADER_LEN` or the whole prefix buffer). Returns `true` once
    /// `want` bytes are buffered.
    fn drain_prefix(&mut self, in_queue: &mut ChunkQueue, want: usize) -> bool {
        if self.prefix_filled >= want {
            return true;
        }
        let missing = want - self.prefix_filled;
        let mut tmp = Vec::with_capacity(missing);
        in_queue.drain_into(missing, &mut tmp);
        let n = tmp.len();
        let start = self.prefix_filled;
        self.prefix[start..start + n].copy_from_slice(&tmp);
        self.prefix_filled += n;
        self.prefix_filled >= want
    }

    /// `GET_BODY_CHUNK` / `SEND_HEADERS` / `END_RESPONSE`: buffer the whole
    /// payload, then decode it in one shot.
    fn step_buffered(&mut self, in_queue: &mut ChunkQueue,
        response: &mut Response, is_closing: &mut bool) -> Result<Progress>
    {
        let (ptype, length, complete) = {
            let packet = self.packet.as_mut().unwrap();
            let buf = match packet.phase {
                Phase::Payload(ref mut buf) => buf,
                Phase::Chunk(_) => unreachable!(),
            };
            if buf.len() < packet.length {
                let missing = packet.length - buf.len();
                in_queue.drain_into(missing, buf);
            }
            (packet.ptype, packet.length, buf.len() == packet.length)
        };
        if !complete {
            return Ok(Progress::NeedMore);
        }
        let payload = match self.packet.take().unwrap().phase {
            Phase::Payload(buf) => buf,
            Phase::Chunk(_) => unreachable!(),
        };
        self.reset();
        let mut cur = Cursor::new(&payload[..]);
        match ptype {
            GET_BODY_CHUNK => {
                cur.decode_int16()?;
                Ok(Progress::PacketDone)
            }
            SEND_HEADERS => {
                decode_send_headers(&mut cur, response)?;
                Ok(Progress::PacketDone)
            }
            END_RESPONSE => {
                let reuse = if length >= 1 { payload[0] } else { 0 };
                if reuse != 0 {
                    *is_closing = true;
                }
                Ok(Progress::StreamDone)
            }
            _ => unreachable!(),
        }
    }

    /// `SEND_BODY_CHUNK`'s zero-copy fast path: the payload never touches
    /// the scratch buffer, it's stolen straight into `out_queue`.
    fn step_chunk(&mut self, in_queue: &mut ChunkQueue,
        out_queue: &mut ChunkQueue) -> Result<Progress>
    {
        loop {
            let packet_length = self.packet.as_ref().unwrap().length;
            let next = {
                let packet = self.packet.as_mut().unwrap();
                let phase = match packet.phase {
                    Phase::Chunk(ref mut p) => p,
                    Phase::Payload(_) => unreachable!(),
                };
                match *phase {
                    ChunkPhase::Length { ref mut buf, ref mut filled } => {
                        let missing = 2 - *filled;
                        let mut tmp = Vec::with_capacity(missing);
                        in_queue.drain_into(missing, &mut tmp);
                        let n = tmp.len();
                        buf[*filled..*filled + n].copy_from_slice(&tmp);
                        *filled += n;
                        if *filled < 2 {
                            return Ok(Progress::NeedMore);
                        }
                        let chunk_len = BigEndian::read_u16(&buf[..]) as usize;
                        let padding = packet_length.checked_sub(2 + chunk_len)
                            .ok_or_else(|| Error::NegativeLength(
                                packet_length as i32 - (2 + chunk_len) as i32))?;
                        Some(ChunkPhase::Body {
                            remaining: chunk_len,
                            padding: padding,
                        })
                    }
                    ChunkPhase::Body { ref mut remaining, padding } => {
                        if *remaining > 0 {
                            let moved = in_queue.steal_bytes(out_queue, *remaining);
                            *remaining -= moved;
                            if *remaining > 0 {
                                return Ok(Progress::NeedMore);
                            }
                        }
                        Some(ChunkPhase::Padding { remaining: padding })
                    }
                    ChunkPhase::Padding { ref mut remaining } => {
                        if *remaining > 0 {
                            let skipped = in_queue.skip(*remaining);
                            *remaining -= skipped;
                            if *remaining > 0 {
                                return Ok(Progress::NeedMore);
                            }
                        }
                        None
                    }
                }
            };
            match next {
                Some(phase) => {
                    if let Some(packet) = self.packet.as_mut() {
                        packet.phase = Phase::Chunk(phase);
                    }
                }
                None => {
                    self.reset();
                    return Ok(Progress::PacketDone);
                }
            }
        }
    }
}

fn decode_send_headers(cur: &mut Cursor, response: &mut Response) -> Result<()> {
    let status = cur.decode_int16()?;
    let reason = cur.decode_string(false)?;
    let count = cur.decode_int16()?;
    response.status = Some(status);
    response.reason = reason;
    for _ in 0..count {
        let key = cur.decode_string(true)?;
        let value = cur.decode_string(false)?;
        response.headers.push((key, value));
    }
    Ok(())
}

/// Drives `decode_step` until it returns `NeedMore`/`StreamDone`/an error,
/// or `in_queue` runs dry.
pub fn decode_loop(state: &mut ParseState, in_queue: &mut ChunkQueue,
    out_queue: &mut ChunkQueue, response: &mut Response, is_closing: &mut bool)
    -> Result<Progress>
{
    let mut any = false;
    loop {
        if in_queue.is_empty() {
            return Ok(if any { Progress::PacketDone } else { Progress::NeedMore });
        }
        match state.decode_step(in_queue, out_queue, response, is_closing)? {
            Progress::NeedMore => return Ok(Progress::NeedMore),
            Progress::StreamDone => return Ok(Progress::StreamDone),
            Progress::PacketDone => any = true,
        }
    }
}

/// Like `decode_loop`, but returns as soon as `response.status` has been set
/// by a decoded `SEND_HEADERS` packet.
pub fn parse_response_header(state: &mut ParseState, in_queue: &mut ChunkQueue,
    out_queue: &mut ChunkQueue, response: &mut Response, is_closing: &mut bool)
    -> Result<HeaderProgress>
{
    loop {
        if response.status.is_some() {
            return Ok(HeaderProgress::Success);
        }
        if in_queue.is_empty() {
            return Ok(HeaderProgress::NeedMore);
        }
        match state.decode_step(in_queue, out_queue, response, is_closing)? {
            Progress::NeedMore => return Ok(HeaderProgress::NeedMore),
            Progress::StreamDone => return Ok(HeaderProgress::Success),
            Progress::PacketDone => continue,
        }
    }
}

#[cfg(test)]
mod test {
    use queue::ChunkQueue;
    use session::Response;
    use wire::{encode_byte, encode_int16, encode_string};
    use super::*;

    fn decode_all(bytes: &[u8]) -> (Progress, Response, Vec<u8>, bool) {
        let mut state = ParseState::new();
        let mut in_queue = ChunkQueue::new();
        in_queue.append_buffer(bytes);
        let mut out_queue = ChunkQueue::new();
        let mut response = Response::new();
        let mut is_closing = false;
        let progress = decode_loop(&mut state, &mut in_queue, &mut out_queue,
            &mut response, &mut is_closing).unwrap();
        (progress, response, out_queue.to_vec(), is_closing)
    }

    /// Builds a well-formed `SEND_HEADERS` packet carrying a status, a
    /// reason phrase, and two common-coded headers.
    fn send_headers_with_two_common_headers() -> Vec<u8> {
        use netbuf::Buf;

        let mut payload = Buf::new();
        encode_byte(&mut payload, SEND_HEADERS);
        encode_int16(&mut payload, 200);
        encode_string(&mut payload, Some("OK"));
        encode_int16(&mut payload, 2);
        encode_int16(&mut payload, 0xA001); // Content-Type (common code)
        encode_string(&mut payload, Some("text/html"));
        encode_int16(&mut payload, 0xA003); // Content-Length (common code)
        encode_string(&mut payload, Some("5"));

        let mut packet = Vec::new();
        packet.extend(&[0x41, 0x42]);
        let len = payload.len() as u16;
        packet.push((len >> 8) as u8);
        packet.push((len & 0xFF) as u8);
        packet.extend(&payload[..]);
        packet
    }

    #[test]
    fn send_headers_decodes_status_reason_and_headers() {
        let bytes = send_headers_with_two_common_headers();
        let (progress, response, _, _) = decode_all(&bytes);
        assert_eq!(progress, Progress::PacketDone);
        assert_eq!(response.status, Some(200));
        assert_eq!(response.reason, "OK");
        assert_eq!(response.headers, vec![
            ("Content-Type".to_string(), "text/html".to_string()),
            ("Content-Length".to_string(), "5".to_string()),
        ]);
    }

    #[test]
    fn end_response_with_reuse_flag_marks_session_closing() {
        let bytes = [0x41, 0x42, 0x00, 0x02, 0x05, 0x01];
        let (progress, _, _, is_closing) = decode_all(&bytes);
        assert_eq!(progress, Progress::StreamDone);
        assert!(is_closing);
    }

    #[test]
    fn split_delivery_byte_by_byte_yields_same_result_as_one_shot() {
        let packet = send_headers_with_two_common_headers();
        let mut state = ParseState::new();
        let mut in_queue = ChunkQueue::new();
        let mut out_queue = ChunkQueue::new();
        let mut response = Response::new();
        let mut is_closing = false;
        for (i, &b) in packet.iter().enumerate() {
            in_queue.append_buffer(&[b]);
            let progress = decode_loop(&mut state, &mut in_queue, &mut out_queue,
                &mut response, &mut is_closing).unwrap();
            if i + 1 < packet.len() {
                assert_eq!(progress, Progress::NeedMore,
                    "expected need_more after byte {}", i + 1);
            } else {
                assert_eq!(progress, Progress::PacketDone);
            }
        }
        assert_eq!(response.status, Some(200));
        assert_eq!(response.reason, "OK");
        assert_eq!(response.headers, vec![
            ("Content-Type".to_string(), "text/html".to_string()),
            ("Content-Length".to_string(), "5".to_string()),
        ]);
    }

    #[test]
    fn body_chunks_stream_into_out_queue_across_two_packets() {
        let mut bytes = Vec::new();
        // SEND_BODY_CHUNK "ABCD": header len=7 (type+2+4), chunk len=4.
        bytes.extend(&[0x41, 0x42, 0x00, 0x07, 0x03, 0x00, 0x04]);
        bytes.extend(b"ABCD");
        // SEND_BODY_CHUNK "EFG": header len=6 (type+2+3), chunk len=3.
        bytes.extend(&[0x41, 0x42, 0x00, 0x06, 0x03, 0x00, 0x03]);
        bytes.extend(b"EFG");
        let (progress, _, out, _) = decode_all(&bytes);
        assert_eq!(progress, Progress::PacketDone);
        assert_eq!(out, b"ABCDEFG");
    }

    #[test]
    fn send_body_chunk_skips_trailing_padding() {
        // chunk len=2 ("AB"), declared packet length leaves 1 padding byte.
        let mut bytes = Vec::new();
        bytes.extend(&[0x41, 0x42, 0x00, 0x06, 0x03, 0x00, 0x02]);
        bytes.extend(b"AB");
        bytes.push(0x00);
        let (progress, _, out, _) = decode_all(&bytes);
        assert_eq!(progress, Progress::PacketDone);
        assert_eq!(out, b"AB");
    }

    #[test]
    fn wrong_direction_magic_is_rejected() {
        let bytes = [0x12, 0x34, 0x00, 0x02, 0x04, 0x00];
        let mut state = ParseState::new();
        let mut in_queue = ChunkQueue::new();
        in_queue.append_buffer(&bytes);
        let mut out_queue = ChunkQueue::new();
        let mut response = Response::new();
        let mut is_closing = false;
        let err = decode_loop(&mut state, &mut in_queue, &mut out_queue,
            &mut response, &mut is_closing).unwrap_err();
        match err {
            Error::BadMagic(got) => assert_eq!(got, 0x1234),
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn get_body_chunk_has_no_response_side_effect() {
        let bytes = [0x41, 0x42, 0x00, 0x03, 0x06, 0x10, 0x00];
        let (progress, response, _, _) = decode_all(&bytes);
        assert_eq!(progress, Progress::PacketDone);
        assert_eq!(response.status, None);
    }

    #[test]
    fn parse_response_header_stops_after_status_even_with_body_queued() {
        let mut state = ParseState::new();
        let mut in_queue = ChunkQueue::new();
        in_queue.append_buffer(&send_headers_with_two_common_headers());
        in_queue.append_buffer(&[0x41, 0x42, 0x00, 0x02, 0x05, 0x00]);
        let mut out_queue = ChunkQueue::new();
        let mut response = Response::new();
        let mut is_closing = false;
        let progress = parse_response_header(&mut state, &mut in_queue,
            &mut out_queue, &mut response, &mut is_closing).unwrap();
        assert_eq!(progress, HeaderProgress::Success);
        assert_eq!(response.status, Some(200));
        // The queued END_RESPONSE packet is untouched.
        assert!(!in_queue.is_empty());
    }
}
