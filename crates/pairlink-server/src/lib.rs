pub mod dispatch;
pub mod handlers;
pub mod render;
pub mod server;
pub mod service;
pub mod wire;

pub use dispatch::{draw_outcome, DispatchConfig};
pub use render::{QrPngRenderer, TokenRenderer};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
pub use service::{DispatchAck, DispatchStats, SessionService, StatusView};
