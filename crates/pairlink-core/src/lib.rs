//! Pairing session core: the connection lifecycle, pairing-token policy,
//! message records and the error taxonomy shared by the server crate.

pub mod errors;
pub mod ids;
pub mod messages;
pub mod session;
pub mod token;

pub use errors::{DispatchFailure, RenderError, SessionError};
pub use messages::{normalize_recipient, Message, MessageLog, MessageOutcome};
pub use session::{SessionState, StatusSnapshot};
pub use token::PairingToken;
