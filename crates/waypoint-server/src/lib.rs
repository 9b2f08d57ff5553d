pub mod connection;
pub mod registry;
pub mod server;

pub use registry::{SessionRegistry, SessionSummary};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle, Services};
