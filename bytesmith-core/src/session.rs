use crate::builder;
use crate::config::ToolchainConfig;
use crate::console::{Console, ConsoleBuffer, ConsoleSink};
use crate::error::{ConsoleError, Result};
use crate::language::Language;
use crate::supervisor::ProcessSupervisor;
use crate::SessionStatus;

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// The façade the editor talks to.
/// The UI holds one of these plus the [`Console`] returned alongside it.
#[derive(Debug)]
pub struct Session {
    config: ToolchainConfig,
    supervisor: ProcessSupervisor,
    console: ConsoleSink,
    file_path: Mutex<Option<PathBuf>>,
    language: Mutex<Language>,
}

impl Session {
    pub fn new(config: ToolchainConfig) -> (Self, Console) {
        let (console, events) = ConsoleSink::channel();
        let buffer = ConsoleBuffer::new(config.prompt.clone());

        let session = Self {
            supervisor: ProcessSupervisor::new(console.clone()),
            console,
            config,
            file_path: Mutex::new(None),
            language: Mutex::new(Language::default()),
        };

        (session, Console::new(buffer, events))
    }

    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.supervisor.status()
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Pid of the live child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.file_path.lock().clone()
    }

    pub fn language(&self) -> Language {
        *self.language.lock()
    }

    /// Build and start `path` as `language`.
    ///
    /// Refused with `AlreadyRunning` while another run is building or live;
    /// the existing process is left alone. Build and spawn failures are
    /// written to the console and leave the slot idle. A [`stop`](Self::stop)
    /// during the build ends it with `Cancelled`.
    pub async fn run(&self, path: impl AsRef<Path>, language: Language) -> Result<()> {
        let path = path.as_ref();

        let reservation = match self.supervisor.reserve() {
            Ok(r) => r,
            Err(e) => return Err(self.report(e)),
        };

        *self.file_path.lock() = Some(path.to_path_buf());
        *self.language.lock() = language;

        tracing::info!(path = %path.display(), %language, "Run requested");
        self.console.append(format!("\nRunning {}...\n", display_name(path)));

        let built = tokio::select! {
            biased;
            _ = reservation.cancelled() => Err(ConsoleError::Cancelled),
            built = builder::build(path, language, &self.config) => built,
        };
        let spec = match built {
            Ok(spec) => spec,
            Err(e) => return Err(self.report(e)),
        };

        match self.supervisor.spawn(reservation, &spec) {
            Ok(_) => Ok(()),
            Err(e) => Err(self.report(e)),
        }
    }

    /// Relay one completed input line to the child, then open a new prompt.
    /// The line is queued, never waited on.
    pub fn submit_line(&self, text: &str) -> Result<()> {
        self.console.append("\n");

        let result = self.supervisor.write_line(text);
        match &result {
            Ok(()) => tracing::debug!(bytes = text.len() + 1, "Input relayed"),
            Err(ConsoleError::NoProcess) => self.console.line(&ConsoleError::NoProcess.to_string()),
            Err(e) => self.console.line(&format!("Failed to handle input: {}", e)),
        }

        self.console.open_prompt();
        result
    }

    /// Kill the running process, or abandon the build in progress. With
    /// neither this only prints a note and returns `false`.
    pub fn stop(&self) -> bool {
        if self.supervisor.terminate() {
            self.console.append("\nProcess stopped by user.\n");
            self.console.open_prompt();
            true
        } else if self.supervisor.cancel_build() {
            self.console.append("\nBuild cancelled by user.\n");
            self.console.open_prompt();
            true
        } else {
            self.console.line("No running process to stop.");
            false
        }
    }

    pub fn clear(&self) {
        self.console.clear();
        self.console.open_prompt();
    }

    /// The editor started a new, unsaved file.
    pub fn new_file(&self) {
        *self.file_path.lock() = None;
        self.console.clear();
    }

    /// Kill any live process or build without console output. Used on exit.
    pub fn shutdown(&self) {
        if self.supervisor.terminate() {
            tracing::info!("Process terminated on shutdown");
        } else if self.supervisor.cancel_build() {
            tracing::info!("Build abandoned on shutdown");
        }
    }

    /// `<file> | <language> | <status>` for a status bar.
    pub fn status_line(&self) -> String {
        let file = self
            .file_path()
            .map(|p| display_name(&p))
            .unwrap_or_else(|| "No file loaded".to_string());
        format!("{} | {} | {}", file, self.language(), self.status().label())
    }

    fn report(&self, error: ConsoleError) -> ConsoleError {
        let message = error.to_string();
        match &error {
            ConsoleError::Cancelled => tracing::debug!("Run ended by a stopped build"),
            ConsoleError::AlreadyRunning => self.console.append(format!("\n{}\n", message)),
            // Compiler output usually carries its own trailing newline.
            _ if message.ends_with('\n') => self.console.append(message),
            _ => self.console.line(&message),
        }
        error
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
