//! Bit-exact encoders/decoders for the AJP13 scalar types.
//!
//! `encode_*` append to a `netbuf::Buf`. `Cursor` reads back out of an
//! already-assembled byte slice (a whole packet's payload, handed over once
//! the caller knows it's fully buffered) using `byteorder::BigEndian` to pull
//! fixed-width integers out of it.

use byteorder::{BigEndian, ByteOrder};
use netbuf::Buf;

use enums::headers::{response_header_name, COMMON_HEADER_MASK};
use error::{Error, Result};

/// Header server->container packets carry.
pub const SERVER_MAGIC: u16 = 0x1234;
/// Header container->server packets carry.
pub const CONTAINER_MAGIC: u16 = 0x4142;

/// 4-byte header: 2-byte magic + 2-byte length.
pub const FULL_HEADER_LEN: usize = 4;

/// Largest payload this codec will emit or accept.
pub const AJP13_MAX_PACKET_SIZE: usize = 8192;

pub fn encode_byte(buf: &mut Buf, v: u8) {
    buf.extend(&[v]);
}

pub fn encode_int16(buf: &mut Buf, v: u16) {
    let mut tmp = [0u8; 2];
    BigEndian::write_u16(&mut tmp, v);
    buf.extend(&tmp);
}

/// `None` writes the "absent" marker `0xFFFF` and nothing else. `Some(s)`
/// writes a 2-byte length (not counting the terminator), the raw bytes,
/// and a trailing NUL.
pub fn encode_string(buf: &mut Buf, s: Option<&str>) {
    match s {
        None => encode_int16(buf, 0xFFFF),
        Some(s) => {
            let bytes = s.as_bytes();
            encode_int16(buf, bytes.len() as u16);
            buf.extend(bytes);
            buf.extend(&[0u8]);
        }
    }
}

/// Uppercases `key` (ASCII only, and only if short enough to have a
/// possible common-header code — longer keys fall straight through as
/// strings) and emits either the matching `0xA0xx` code or the key as a
/// string, followed by `value` as a string.
pub fn encode_header_kv(buf: &mut Buf, key: &str, value: &str) {
    use enums::headers::{request_header_code, MAX_COMMON_HEADER_KEY_LEN};

    let code = if key.len() <= MAX_COMMON_HEADER_KEY_LEN {
        let upper = key.to_ascii_uppercase();
        request_header_code(&upper)
    } else {
        None
    };
    match code {
        Some(code) => encode_int16(buf, code),
        None => encode_string(buf, Some(key)),
    }
    encode_string(buf, Some(value));
}

/// Reads back out of an already-fully-buffered byte slice.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Cursor<'a> {
        Cursor { data: data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(Error::Truncated);
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn decode_int16(&mut self) -> Result<u16> {
        if self.remaining() < 2 {
            return Err(Error::Truncated);
        }
        let v = BigEndian::read_u16(&self.data[self.pos..self.pos + 2]);
        self.pos += 2;
        Ok(v)
    }

    /// `is_header` enables `0xA0xx` common-code substitution for header
    /// *names* only; the status reason and header *values* are always
    /// decoded with it off.
    pub fn decode_string(&mut self, is_header: bool) -> Result<String> {
        let len = self.decode_int16()?;
        if is_header && (len & COMMON_HEADER_MASK) == COMMON_HEADER_MASK {
            return response_header_name(len)
                .map(|s| s.to_string())
                .ok_or(Error::UnknownHeaderCode(len));
        }
        let len = len as usize;
        if self.remaining() < len + 1 {
            return Err(Error::Truncated);
        }
        let s = String::from_utf8_lossy(&self.data[self.pos..self.pos + len])
            .into_owned();
        self.pos += len + 1;
        Ok(s)
    }
}
