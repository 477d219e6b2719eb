//! HTTP method <-> AJP13 method code mapping. Both the fast-path lookup and
//! the fallback return the AJP13 code.

/// Code sent on the wire for a method this table doesn't know, or for
/// `CONNECT`.
pub const METHOD_UNKNOWN: u8 = 0xFF;

/// HTTP methods the codec can frame as a `FORWARD_REQUEST` method code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Options,
    Get,
    Head,
    Post,
    Put,
    Delete,
    Propfind,
    Proppatch,
    Mkcol,
    Copy,
    Move,
    Lock,
    Unlock,
    Report,
    Checkin,
    Checkout,
    VersionControl,
    Uncheckout,
    Mkactivity,
    Merge,
    Label,
    /// `CONNECT`, or anything else the table doesn't recognize.
    Other(String),
}

impl<'a> From<&'a str> for Method {
    fn from(s: &'a str) -> Method {
        match s {
            "OPTIONS" => Method::Options,
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PROPFIND" => Method::Propfind,
            "PROPPATCH" => Method::Proppatch,
            "MKCOL" => Method::Mkcol,
            "COPY" => Method::Copy,
            "MOVE" => Method::Move,
            "LOCK" => Method::Lock,
            "UNLOCK" => Method::Unlock,
            "REPORT" => Method::Report,
            "CHECKIN" => Method::Checkin,
            "CHECKOUT" => Method::Checkout,
            "VERSION-CONTROL" => Method::VersionControl,
            "UNCHECKOUT" => Method::Uncheckout,
            "MKACTIVITY" => Method::Mkactivity,
            "MERGE" => Method::Merge,
            "LABEL" => Method::Label,
            other => Method::Other(other.to_string()),
        }
    }
}

impl Method {
    /// The byte this method is framed as in a `FORWARD_REQUEST` packet.
    pub fn ajp13_code(&self) -> u8 {
        use self::Method::*;
        match *self {
            Options => 1,
            Get => 2,
            Head => 3,
            Post => 4,
            Put => 5,
            Delete => 6,
            Propfind => 8,
            Proppatch => 9,
            Mkcol => 10,
            Copy => 11,
            Move => 12,
            Lock => 13,
            Unlock => 14,
            Report => 16,
            VersionControl => 17,
            Checkin => 18,
            Checkout => 19,
            Uncheckout => 20,
            Mkactivity => 27,
            Merge => 25,
            Label => 24,
            Other(_) => METHOD_UNKNOWN,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Method;

    #[test]
    fn known_methods_map_to_codes() {
        assert_eq!(Method::from("GET").ajp13_code(), 2);
        assert_eq!(Method::from("POST").ajp13_code(), 4);
        assert_eq!(Method::from("HEAD").ajp13_code(), 3);
        assert_eq!(Method::from("OPTIONS").ajp13_code(), 1);
        assert_eq!(Method::from("PUT").ajp13_code(), 5);
        assert_eq!(Method::from("DELETE").ajp13_code(), 6);
    }

    #[test]
    fn connect_and_unknown_map_to_unknown() {
        assert_eq!(Method::from("CONNECT").ajp13_code(), super::METHOD_UNKNOWN);
        assert_eq!(Method::from("FROBNICATE").ajp13_code(), super::METHOD_UNKNOWN);
    }
}
