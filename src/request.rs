//! The `FORWARD_REQUEST` / `DATA`-packet encoder: assembles a packet into a
//! buffer, then backpatches its 4-byte header once the body's length is
//! known, including the temp-file `is_temp` hand-off between input and
//! output chunk queues.

use byteorder::{BigEndian, ByteOrder};
use netbuf::Buf;

use queue::ChunkQueue;
use session::Request;
use wire::{encode_byte, encode_header_kv, encode_int16, encode_string,
    AJP13_MAX_PACKET_SIZE, FULL_HEADER_LEN, SERVER_MAGIC};

const FORWARD_REQUEST: u8 = 0x02;
const ARE_DONE: u8 = 0xFF;

const ATTR_REMOTE_USER: u8 = 0x03;
const ATTR_QUERY_STRING: u8 = 0x05;
const ATTR_JVM_ROUTE: u8 = 0x06;

/// Appends the `FORWARD_REQUEST` body (everything after the 4-byte AJP
/// header) for `request` into `buf`.
pub fn emit_forward_request(buf: &mut Buf, request: &Request) {
    encode_byte(buf, request.method.ajp13_code());
    encode_string(buf, Some(&request.protocol));
    encode_string(buf, Some(&request.uri));
    encode_string(buf, Some(&request.remote_addr));
    encode_string(buf, Some("")); // remote host: never populated upstream.
    let server_name = match request.server_name {
        Some(ref name) => name.as_str(),
        None => &request.local_addr,
    };
    encode_string(buf, Some(server_name));
    encode_int16(buf, request.server_port);
    encode_byte(buf, if request.is_ssl { 1 } else { 0 });

    let count = request.headers.len() as u16 + 1;
    encode_int16(buf, count);
    encode_header_kv(buf, "Content-Length", &request.content_length.to_string());
    for &(ref name, ref value) in &request.headers {
        encode_header_kv(buf, name, value);
    }

    if let Some(ref user) = request.remote_user {
        if !user.is_empty() {
            encode_byte(buf, ATTR_REMOTE_USER);
            encode_string(buf, Some(user));
        }
    }
    if let Some(ref query) = request.query_string {
        if !query.is_empty() {
            encode_byte(buf, ATTR_QUERY_STRING);
            encode_string(buf, Some(query));
        }
    }
    if let Some(ref route) = request.jvm_route {
        if !route.is_empty() {
            encode_byte(buf, ATTR_JVM_ROUTE);
            encode_string(buf, Some(route));
        }
    }
    encode_byte(buf, ARE_DONE);
}

fn patch_header(buf: &mut Buf, magic: u16, length: u16) {
    let mut header = [0u8; FULL_HEADER_LEN];
    BigEndian::write_u16(&mut header[0..2], magic);
    BigEndian::write_u16(&mut header[2..4], length);
    buf[..FULL_HEADER_LEN].copy_from_slice(&header);
}

/// Builds the complete `FORWARD_REQUEST` packet — the 4-byte header
/// followed by the packet-type prefix and `emit_forward_request`'s body —
/// and queues it on `out_queue`. The header is reserved first and
/// backpatched once the body's length is known.
pub fn emit_request_chunk(request: &Request, out_queue: &mut ChunkQueue) {
    let mut buf = Buf::new();
    buf.extend(&[0u8; FULL_HEADER_LEN]);
    encode_byte(&mut buf, FORWARD_REQUEST);
    emit_forward_request(&mut buf, request);
    let body_len = (buf.len() - FULL_HEADER_LEN) as u16;
    patch_header(&mut buf, SERVER_MAGIC, body_len);
    out_queue.append_buffer(&buf[..]);
}

/// Frames the request body sitting in `in_queue` into one or more `DATA`
/// packets on `out_queue`, draining `in_queue` completely. Zero-copy-forwards
/// file-backed chunks, handing the `is_temp` ownership flag to the last
/// output chunk that references a given file.
pub fn emit_request_body(in_queue: &mut ChunkQueue, out_queue: &mut ChunkQueue) {
    const MAX_DATA: usize = AJP13_MAX_PACKET_SIZE - 2;
    loop {
        in_queue.remove_finished();
        if in_queue.is_empty() {
            return;
        }
        if in_queue.front_is_file() {
            let slice = match in_queue.take_file_bytes(MAX_DATA as u64) {
                Some(slice) => slice,
                None => return,
            };
            let n = slice.length as u16;
            let mut header = Buf::new();
            header.extend(&[0u8; FULL_HEADER_LEN]);
            encode_int16(&mut header, n);
            patch_header(&mut header, SERVER_MAGIC, n + 2);
            out_queue.append_buffer(&header[..]);
            let is_temp = slice.is_last && slice.is_temp;
            out_queue.append_file(slice.path, slice.offset, slice.length, is_temp);
        } else {
            let want = in_queue.buffered_len().min(MAX_DATA);
            if want == 0 {
                return;
            }
            let mut data = Vec::with_capacity(want);
            let got = in_queue.drain_into(want, &mut data);
            let mut buf = Buf::new();
            buf.extend(&[0u8; FULL_HEADER_LEN]);
            encode_int16(&mut buf, got as u16);
            buf.extend(&data);
            patch_header(&mut buf, SERVER_MAGIC, (got + 2) as u16);
            out_queue.append_buffer(&buf[..]);
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::sync::Arc;

    use byteorder::{BigEndian, ByteOrder};

    use enums::method::Method;
    use queue::ChunkQueue;
    use wire::{Cursor, FULL_HEADER_LEN};
    use super::*;

    fn sample_request() -> Request {
        let mut req = Request::new(Method::Get, "HTTP/1.1", "/t", "1.2.3.4");
        req.server_name = Some("h".to_string());
        req.server_port = 8080;
        req
    }

    #[test]
    fn forward_request_emits_magic_patched_length_and_terminator() {
        let request = sample_request();
        let mut out_queue = ChunkQueue::new();
        emit_request_chunk(&request, &mut out_queue);
        let bytes = out_queue.to_vec();

        assert_eq!(&bytes[0..2], &[0x12, 0x34]);
        let declared = BigEndian::read_u16(&bytes[2..4]);
        assert_eq!(declared as usize, bytes.len() - FULL_HEADER_LEN);
        assert_eq!(bytes[4], FORWARD_REQUEST);
        assert_eq!(bytes[5], Method::Get.ajp13_code());
        assert_eq!(*bytes.last().unwrap(), ARE_DONE);
    }

    #[test]
    fn forced_content_length_header_is_always_present() {
        let request = sample_request();
        let mut buf = Buf::new();
        emit_forward_request(&mut buf, &request);
        let bytes: Vec<u8> = buf[..].to_vec();
        let mut cur = Cursor::new(&bytes[..]);
        cur.read_u8().unwrap(); // method
        cur.decode_string(false).unwrap(); // protocol
        cur.decode_string(false).unwrap(); // uri
        cur.decode_string(false).unwrap(); // remote addr
        cur.decode_string(false).unwrap(); // remote host
        cur.decode_string(false).unwrap(); // server name
        cur.decode_int16().unwrap(); // server port
        cur.read_u8().unwrap(); // is_ssl
        let count = cur.decode_int16().unwrap();
        assert_eq!(count, 1);
        let code = cur.decode_int16().unwrap();
        assert_eq!(code, 0xA008); // Content-Length common code
        assert_eq!(cur.decode_string(false).unwrap(), "0");
    }

    #[test]
    fn optional_attributes_are_only_emitted_when_present() {
        let mut request = sample_request();
        request.query_string = Some("a=1".to_string());
        let mut buf = Buf::new();
        emit_forward_request(&mut buf, &request);
        let bytes: &[u8] = &buf[..];
        assert!(bytes.windows(1).any(|w| w == [ATTR_QUERY_STRING]));
        assert!(!bytes.windows(1).any(|w| w == [ATTR_REMOTE_USER]));
    }

    #[test]
    fn server_name_falls_back_to_local_addr_when_absent() {
        let mut request = sample_request();
        request.server_name = None;
        request.local_addr = "10.0.0.9".to_string();
        let mut buf = Buf::new();
        emit_forward_request(&mut buf, &request);
        let bytes: Vec<u8> = buf[..].to_vec();
        let mut cur = Cursor::new(&bytes[..]);
        cur.read_u8().unwrap();
        cur.decode_string(false).unwrap();
        cur.decode_string(false).unwrap();
        cur.decode_string(false).unwrap();
        cur.decode_string(false).unwrap();
        assert_eq!(cur.decode_string(false).unwrap(), "10.0.0.9");
    }

    #[test]
    fn emit_request_body_frames_data_packets() {
        let mut in_queue = ChunkQueue::new();
        in_queue.append_buffer(b"hello world");
        let mut out_queue = ChunkQueue::new();
        emit_request_body(&mut in_queue, &mut out_queue);

        let bytes = out_queue.to_vec();
        assert_eq!(&bytes[0..2], &[0x12, 0x34]);
        let declared = BigEndian::read_u16(&bytes[2..4]);
        assert_eq!(declared as usize, 11 + 2);
        let n = BigEndian::read_u16(&bytes[4..6]);
        assert_eq!(n as usize, 11);
        assert_eq!(&bytes[6..], b"hello world");
    }

    #[test]
    fn emit_request_body_splits_large_bodies_across_packets() {
        let big = vec![b'x'; AJP13_MAX_PACKET_SIZE * 2];
        let mut in_queue = ChunkQueue::new();
        in_queue.append_buffer(&big);
        let mut out_queue = ChunkQueue::new();
        emit_request_body(&mut in_queue, &mut out_queue);

        let bytes = out_queue.to_vec();
        let mut pos = 0;
        let mut total = Vec::new();
        while pos < bytes.len() {
            assert_eq!(&bytes[pos..pos + 2], &[0x12, 0x34]);
            let declared = BigEndian::read_u16(&bytes[pos + 2..pos + 4]) as usize;
            let n = BigEndian::read_u16(&bytes[pos + 4..pos + 6]) as usize;
            assert_eq!(declared, n + 2);
            assert!(n <= AJP13_MAX_PACKET_SIZE - 2);
            total.extend_from_slice(&bytes[pos + 6..pos + 6 + n]);
            pos += FULL_HEADER_LEN + 2 + n;
        }
        assert_eq!(total, big);
    }

    #[test]
    fn temp_file_ownership_moves_to_last_data_packet_only() {
        let mut in_queue = ChunkQueue::new();
        let path = Arc::new(PathBuf::from("/tmp/upload"));
        in_queue.append_file(path, 0, (AJP13_MAX_PACKET_SIZE * 2) as u64, true);
        let mut out_queue = ChunkQueue::new();
        emit_request_body(&mut in_queue, &mut out_queue);
        assert!(in_queue.is_empty());
    }
}
