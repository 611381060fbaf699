//! Command builder.
//!
//! Maps `(file, language)` to the invocation that runs it. Compiled languages
//! run their compiler to completion first; a non-empty compiler error stream
//! aborts the build and no run command is produced.

use crate::config::ToolchainConfig;
use crate::error::{ConsoleError, Result};
use crate::language::Language;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// An external invocation: program, arguments, optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// A tokio command with no stdio configuration applied yet.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Directory containing `path`, or `.` for a bare file name.
pub fn source_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// The compile step for `language`, if it has one. Pure; nothing is spawned.
pub fn compile_command(
    path: &Path,
    language: Language,
    config: &ToolchainConfig,
) -> Option<CommandSpec> {
    let file = path.to_string_lossy().to_string();
    match language {
        Language::Java => Some(CommandSpec::new(&config.java_compiler).arg(file)),
        Language::Cpp => {
            let output = source_dir(path).join(&config.cpp_output);
            Some(
                CommandSpec::new(&config.cpp_compiler)
                    .arg(file)
                    .arg("-o")
                    .arg(output.to_string_lossy().to_string()),
            )
        }
        Language::Python | Language::JavaScript | Language::PlainText => None,
    }
}

/// The run command for `language`, assuming any compile step already succeeded.
pub fn run_command(
    path: &Path,
    language: Language,
    config: &ToolchainConfig,
) -> Result<CommandSpec> {
    let file = path.to_string_lossy().to_string();
    // Absolute, so the child sees the same directory whatever its cwd is.
    let dir = std::path::absolute(source_dir(path))?;

    match language {
        Language::Java => {
            // Entry class is the file name without its extension.
            let class_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(CommandSpec::new(&config.java_runtime)
                .arg("-cp")
                .arg(dir.to_string_lossy().to_string())
                .arg(class_name)
                .cwd(dir))
        }
        Language::Python => Ok(CommandSpec::new(&config.python).arg(file)),
        Language::JavaScript => Ok(CommandSpec::new(&config.node).arg(file)),
        Language::Cpp => {
            let binary = dir.join(&config.cpp_output);
            Ok(CommandSpec::new(binary.to_string_lossy().to_string()).cwd(dir))
        }
        Language::PlainText => Err(ConsoleError::UnsupportedLanguage(language)),
    }
}

/// Compile (when needed) and return the run command.
///
/// The compiler's error stream is read to completion before deciding;
/// any output there fails the build with [`ConsoleError::Compile`].
pub async fn build(
    path: &Path,
    language: Language,
    config: &ToolchainConfig,
) -> Result<CommandSpec> {
    if !language.is_runnable() {
        return Err(ConsoleError::UnsupportedLanguage(language));
    }

    if let Some(compile) = compile_command(path, language, config) {
        run_compiler(&compile).await?;
    }

    run_command(path, language, config)
}

async fn run_compiler(spec: &CommandSpec) -> Result<()> {
    tracing::info!(command = %spec, "Compiling");

    let mut cmd = spec.to_command();
    // A stopped build drops this future; the compiler goes with it.
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let output = cmd.output().await.map_err(|source| ConsoleError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let details = String::from_utf8_lossy(&output.stderr).to_string();
    if !details.is_empty() {
        tracing::warn!(
            command = %spec,
            exit_code = ?output.status.code(),
            "Compilation failed"
        );
        return Err(ConsoleError::Compile { details });
    }

    Ok(())
}
