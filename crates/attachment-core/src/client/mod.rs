//! Client side of the search surface.
//!
//! [`SearchSession`] holds the state, [`SearchClient`] feeds it keystrokes
//! and backend replies, [`SearchTransport`] carries the protocol.

mod driver;
mod session;
mod transport;

pub use driver::{spawn_client, ClientEvent, ClientView, SearchClient};
pub use session::{NavKey, QueryRequest, SearchSession, SessionState};
pub use transport::{RpcTransport, SearchTransport};
