pub mod headers;
pub mod method;

pub use self::headers::{request_header_code, response_header_name};
pub use self::method::Method;
