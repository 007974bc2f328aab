//! Event relay core
//!
//! A producer serves line-delimited JSON events over TCP. The relay dials it,
//! decodes each line and hands the event to a caller-supplied handler,
//! reconnecting after failures until a termination signal arrives.

pub mod client;
pub mod demo;
pub mod driver;
pub mod protocol;
pub mod session;
pub mod shutdown;

pub use client::{send_once, write_event};
pub use demo::run_demo_producer;
pub use driver::{DriverState, ReconnectDriver};
pub use protocol::{Event, Frame, LineDecoder, StreamEnd, MAX_LINE_BYTES};
pub use session::{Handler, SessionError, SocketSession, Transport};
pub use shutdown::{termination_signal, ShutdownCoordinator};
