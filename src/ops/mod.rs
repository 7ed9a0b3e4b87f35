pub mod filter;
pub mod navigator;
pub mod query;
pub mod router;
pub mod session;

pub use filter::{Filter, FilterStatus};
pub use navigator::{Cursor, NavError, NavEvent, Navigator};
pub use router::{Inbound, Routed, parse_line, parse_message, route};
pub use session::{Notice, NoticeLevel, Session, SessionEvent};
