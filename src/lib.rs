//! Backend-facing Apache JServ Protocol v1.3 codec.
#![recursion_limit="100"]

extern crate netbuf;
extern crate byteorder;
#[macro_use(quick_error)] extern crate quick_error;
#[macro_use] extern crate matches;
#[macro_use] extern crate log;

pub mod wire;
pub mod queue;
pub mod session;
pub mod decoder;
pub mod request;
pub mod error;
pub mod enums;
pub mod plugin;

pub use enums::Method;
pub use error::{Error, Result};
pub use session::{Request, Response, Session};
