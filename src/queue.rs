//! A concrete chunk queue: a FIFO of in-memory buffers and file references.
//! The codec's decoder and encoder operate against this type directly
//! rather than a trait, so this crate's own tests can drive the codec end
//! to end; a proxy core embedding this crate is free to adapt its own
//! socket-backed buffers to the same shape before handing bytes in.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use netbuf::Buf;

/// One file-backed chunk: a byte range of a file on disk, optionally owned
/// (`is_temp`) by the queue that's forwarding it.
#[derive(Debug)]
pub struct FileChunk {
    pub path: Arc<PathBuf>,
    pub offset: u64,
    pub length: u64,
    pub is_temp: bool,
}

enum Chunk {
    Memory(Buf),
    File(FileChunk),
}

impl Chunk {
    fn len(&self) -> u64 {
        match *self {
            Chunk::Memory(ref buf) => buf.len() as u64,
            Chunk::File(ref f) => f.length,
        }
    }
}

/// A slice carved out of a file chunk by `take_file_bytes`.
#[derive(Debug)]
pub struct FileSlice {
    pub path: Arc<PathBuf>,
    pub offset: u64,
    pub length: u64,
    /// Whether the *source* file reference was marked temporary. The
    /// caller must attach the temp-file ownership only to the output
    /// chunk built from the slice where `is_last` is true.
    pub is_temp: bool,
    /// True when this slice exhausts the chunk it was carved from.
    pub is_last: bool,
}

/// FIFO of byte buffers and file references.
#[derive(Default)]
pub struct ChunkQueue {
    chunks: VecDeque<Chunk>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub is_closed: bool,
}

impl ::std::fmt::Debug for ChunkQueue {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("ChunkQueue")
            .field("len", &self.len())
            .field("bytes_in", &self.bytes_in)
            .field("bytes_out", &self.bytes_out)
            .field("is_closed", &self.is_closed)
            .finish()
    }
}

impl ChunkQueue {
    pub fn new() -> ChunkQueue {
        ChunkQueue {
            chunks: VecDeque::new(),
            bytes_in: 0,
            bytes_out: 0,
            is_closed: false,
        }
    }

    /// Appends raw bytes, extending the last chunk in place if it's
    /// already a memory chunk.
    pub fn append_buffer(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let extended = match self.chunks.back_mut() {
            Some(&mut Chunk::Memory(ref mut buf)) => {
                buf.extend(data);
                true
            }
            _ => false,
        };
        if !extended {
            let mut buf = Buf::new();
            buf.extend(data);
            self.chunks.push_back(Chunk::Memory(buf));
        }
        self.bytes_in += data.len() as u64;
    }

    pub fn append_file(&mut self, path: Arc<PathBuf>, offset: u64, length: u64,
        is_temp: bool)
    {
        self.bytes_in += length;
        self.chunks.push_back(Chunk::File(FileChunk {
            path: path,
            offset: offset,
            length: length,
            is_temp: is_temp,
        }));
    }

    /// Bytes enqueued but not yet consumed.
    pub fn len(&self) -> u64 {
        self.bytes_in - self.bytes_out
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes immediately available at the front without touching a file
    /// chunk.
    pub fn buffered_len(&self) -> usize {
        match self.chunks.front() {
            Some(&Chunk::Memory(ref buf)) => buf.len(),
            _ => 0,
        }
    }

    /// Borrows up to `n` contiguous bytes buffered at the front of the
    /// queue. Shorter than `n` if the queue is short or the front chunk is
    /// a file reference.
    pub fn peek(&self, n: usize) -> &[u8] {
        match self.chunks.front() {
            Some(&Chunk::Memory(ref buf)) => {
                let n = n.min(buf.len());
                &buf[..n]
            }
            _ => &[],
        }
    }

    /// Consumes up to `n` bytes from the front of the queue without
    /// copying them anywhere (used to pull bytes into the decoder's
    /// scratch buffer, and to skip padding).
    pub fn consume(&mut self, n: usize) -> usize {
        let mut remaining = n;
        while remaining > 0 {
            let front_len = match self.chunks.front() {
                Some(c) => c.len(),
                None => break,
            };
            if front_len == 0 {
                self.chunks.pop_front();
                continue;
            }
            let take = (front_len as usize).min(remaining);
            let exhausted = match self.chunks.front_mut() {
                Some(&mut Chunk::Memory(ref mut buf)) => {
                    buf.consume(take);
                    buf.len() == 0
                }
                Some(&mut Chunk::File(ref mut f)) => {
                    f.offset += take as u64;
                    f.length -= take as u64;
                    f.length == 0
                }
                None => unreachable!(),
            };
            remaining -= take;
            if exhausted {
                self.chunks.pop_front();
            }
        }
        let consumed = n - remaining;
        self.bytes_out += consumed as u64;
        consumed
    }

    pub fn skip(&mut self, n: usize) -> usize {
        self.consume(n)
    }

    /// Copies up to `n` bytes buffered at the front of the queue into
    /// `dest` and consumes them. Used by the decoder to assemble a packet
    /// header or payload without it ever touching a file-backed chunk.
    /// Returns fewer than `n` bytes if the queue runs short.
    pub fn drain_into(&mut self, n: usize, dest: &mut Vec<u8>) -> usize {
        let avail = self.peek(n);
        let got = avail.len();
        dest.extend_from_slice(avail);
        self.consume(got);
        got
    }

    /// Zero-copy transfer of up to `n` bytes of memory chunks from the
    /// front of `self` into the back of `dest`. Stops early (returning
    /// fewer than `n`) if `self` runs out of buffered memory, including
    /// if the next chunk is file-backed.
    pub fn steal_bytes(&mut self, dest: &mut ChunkQueue, n: usize) -> usize {
        let mut moved = 0;
        while moved < n {
            let want = n - moved;
            let (take, exhausted) = match self.chunks.front_mut() {
                Some(&mut Chunk::Memory(ref mut buf)) => {
                    let take = want.min(buf.len());
                    if take == 0 {
                        break;
                    }
                    dest.append_buffer(&buf[..take]);
                    buf.consume(take);
                    (take, buf.len() == 0)
                }
                _ => break,
            };
            moved += take;
            self.bytes_out += take as u64;
            if exhausted {
                self.chunks.pop_front();
            }
        }
        moved
    }

    /// Carves up to `max` bytes off the file chunk at the front of the
    /// queue, advancing past them. Returns `None` if the front isn't a
    /// file chunk (or the queue is empty).
    pub fn take_file_bytes(&mut self, max: u64) -> Option<FileSlice> {
        let slice = match self.chunks.front_mut() {
            Some(&mut Chunk::File(ref mut f)) => {
                let take = max.min(f.length);
                if take == 0 {
                    return None;
                }
                let is_last = take == f.length;
                let slice = FileSlice {
                    path: f.path.clone(),
                    offset: f.offset,
                    length: take,
                    is_temp: f.is_temp,
                    is_last: is_last,
                };
                f.offset += take;
                f.length -= take;
                slice
            }
            _ => return None,
        };
        self.bytes_out += slice.length;
        if slice.is_last {
            self.chunks.pop_front();
        }
        Some(slice)
    }

    /// True when the chunk at the front of the queue is file-backed.
    pub fn front_is_file(&self) -> bool {
        matches!(self.chunks.front(), Some(&Chunk::File(_)))
    }

    pub fn remove_finished(&mut self) {
        while matches!(self.chunks.front(), Some(c) if c.len() == 0) {
            self.chunks.pop_front();
        }
    }

    /// Concatenates every memory chunk currently queued. Panics if a file
    /// chunk is present — only meant for tests inspecting a pure-bytes
    /// queue (e.g. a decoder's body output queue).
    #[cfg(test)]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            match *chunk {
                Chunk::Memory(ref buf) => out.extend_from_slice(&buf[..]),
                Chunk::File(_) => panic!("to_vec() called on a queue with a file chunk"),
            }
        }
        out
    }
}
