pub mod builder;
pub mod config;
pub mod console;
pub mod error;
pub mod language;
pub mod session;
pub mod supervisor;

// Re-export the façade so users can just use `bytesmith_core::Session`
pub use builder::CommandSpec;
pub use config::ToolchainConfig;
pub use console::{Console, ConsoleBuffer, ConsoleEdit, ConsoleSink};
pub use error::ConsoleError;
pub use language::Language;
pub use session::Session;

/// Lifecycle of the single process slot, as shown on a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No process. The natural rest state.
    #[default]
    Idle,
    /// The slot is reserved while a compile step runs.
    Building,
    /// A child process is live and the prompt is open for input.
    Running,
    /// A kill or a build stop was issued and has not settled yet.
    Stopping,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Ready",
            SessionStatus::Building => "Building",
            SessionStatus::Running => "Running",
            SessionStatus::Stopping => "Stopping",
        }
    }
}

/// The event stream from the core. The UI listens to this to know what to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Append(String),        // Process output or a system message
    PromptOpened,          // Fresh pending-input region
    Cleared,               // Buffer wiped
    Status(SessionStatus), // Process slot changed state
}
