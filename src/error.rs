use std::io;


quick_error! {
    /// Fatal, session-ending failures. Short input alone is never
    /// represented here — see `decoder::Progress::NeedMore`, which is not
    /// an error.
    #[derive(Debug)]
    pub enum Error {
        Io(err: io::Error) {
            description("I/O error")
            display("I/O error: {}", err)
            from()
        }
        BadMagic(got: u16) {
            description("bad ajp13 magic")
            display("bad ajp13 magic: {:#06x}", got)
        }
        UnknownPacketType(code: u8) {
            description("unknown ajp13 packet type")
            display("unknown ajp13 packet type: {:#04x}", code)
        }
        NegativeLength(len: i32) {
            description("negative packet length")
            display("negative packet length: {}", len)
        }
        Truncated {
            description("buffer exhausted past a length already committed to")
        }
        UnknownHeaderCode(code: u16) {
            description("unrecognized common-header code")
            display("unrecognized common-header code: {:#06x}", code)
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;
