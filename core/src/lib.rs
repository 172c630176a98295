pub mod cli;
pub mod config;
pub mod engine;
pub mod session;

// Re-export main types
pub use engine::{
    Computation, Engine, EngineError, Envelope, FrameId, FrameStatus, Injection, Outcome, Val,
};

pub use config::Config;
pub use session::Session;
