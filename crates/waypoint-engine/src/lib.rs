pub mod controller;
pub mod enricher;
pub mod error;
pub mod generator;
pub mod parse;
pub mod prompts;
pub mod resolver;
pub mod session;
pub mod settle;

pub use controller::{CycleReport, Pipeline, RefreshController, RefreshTiming};
pub use enricher::ImageEnricher;
pub use error::EngineError;
pub use generator::ContentGenerator;
pub use resolver::PositionResolver;
pub use session::{Phase, SessionState};
pub use settle::{settle_all, Settled};
