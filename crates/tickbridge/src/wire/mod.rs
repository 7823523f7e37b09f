//! Line-based wire codec.
//!
//! ## Protocol
//!
//! A client opens a TCP connection and writes one request line:
//!
//! ```text
//! <verb>[ <arg1>[ <arg2>...]]
//! ```
//!
//! The server writes exactly one response line and closes the connection:
//!
//! ```text
//! OK: Queued camera
//! ERROR: Query timeout
//! ["main","harvest"]
//! ```
//!
//! Between the connection thread and the host loop, work travels as a
//! [`PendingItem`] whose queued form is `<verb>|<payload>` for commands and
//! `QUERY|<id>|<verb>|<payload>` for queries.

mod errors;
mod item;
mod request;
mod response;

pub use self::errors::WireError;
pub use self::item::{PendingItem, QueryId};
pub use self::request::Request;
pub use self::response::{Response, ResponseWriter};
