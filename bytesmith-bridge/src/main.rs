use anyhow::{Context, Result};
use bytesmith_bridge::command::{BridgeCommand, CommandParser, help_text};
use bytesmith_bridge::render::TerminalRenderer;
use bytesmith_bridge::util;
use bytesmith_core::{Console, ConsoleEdit, ConsoleEvent, Language, Session, ToolchainConfig};

use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};

#[derive(Parser, Debug)]
#[command(name = "bytesmith", version, about = "Run a source file with an interactive console")]
struct Args {
    /// Toolchain config (TOML). Defaults to toolchains.toml in the platform config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language for FILE; detected from the extension when omitted.
    #[arg(long, short)]
    language: Option<Language>,

    /// Log filter used when RUST_LOG is unset, e.g. `bytesmith_core=debug`.
    #[arg(long, default_value = "warn")]
    log: String,

    /// File to run right away.
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    util::init_tracing(&args.log);
    util::install_panic_hook();

    let config = match &args.config {
        Some(path) => ToolchainConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ToolchainConfig::load_default().context("Failed to load default config")?,
    };

    let mut renderer = TerminalRenderer::new(config.prompt.clone());
    let (session, mut console) = Session::new(config);
    let mut out = tokio::io::stdout();

    session.clear();
    if let Some(file) = args.file {
        let language = args.language.unwrap_or_else(|| Language::from_path(&file));
        // Failures are already on the console.
        let _ = session.run(&file, language).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, exiting");
                break;
            }

            event = console.next_event() => {
                let Some(event) = event else { break };
                render(&mut out, &mut renderer, &event).await?;
                flush_pending(&mut out, &mut renderer, &mut console).await?;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("stdin read failed")? else {
                    tracing::info!("stdin closed, exiting");
                    break;
                };

                match CommandParser::parse(&line) {
                    BridgeCommand::Input(text) => {
                        console.edit(ConsoleEdit::End);
                        console.edit(ConsoleEdit::Insert(text));
                        renderer.line_submitted();
                        // Failures are already on the console.
                        let _ = console.submit(&session);
                    }
                    BridgeCommand::Run { path, language } => {
                        let language = language.unwrap_or_else(|| Language::from_path(&path));
                        let _ = session.run(&path, language).await;
                    }
                    BridgeCommand::Stop => {
                        session.stop();
                    }
                    BridgeCommand::Clear => session.clear(),
                    BridgeCommand::New => {
                        session.new_file();
                        session.clear();
                    }
                    BridgeCommand::Status => write_line(&mut out, &session.status_line()).await?,
                    BridgeCommand::Help => write_line(&mut out, &help_text()).await?,
                    BridgeCommand::Invalid(msg) => write_line(&mut out, &msg).await?,
                    BridgeCommand::Quit => break,
                }

                flush_pending(&mut out, &mut renderer, &mut console).await?;
            }
        }
    }

    session.shutdown();
    out.flush().await.context("stdout flush failed")?;
    Ok(())
}

async fn render(out: &mut Stdout, renderer: &mut TerminalRenderer, event: &ConsoleEvent) -> Result<()> {
    if let Some(text) = renderer.render(event) {
        out.write_all(text.as_bytes()).await.context("stdout write failed")?;
    }
    Ok(())
}

/// Render everything already queued, then flush once.
async fn flush_pending(
    out: &mut Stdout,
    renderer: &mut TerminalRenderer,
    console: &mut Console,
) -> Result<()> {
    for event in console.pump() {
        render(out, renderer, &event).await?;
    }
    out.flush().await.context("stdout flush failed")
}

async fn write_line(out: &mut Stdout, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    Ok(())
}
