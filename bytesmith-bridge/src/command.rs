//! Control-line parsing for the terminal front end.
//!
//! Lines starting with `:` drive the session; everything else is typed into
//! the console's pending-input region and submitted. `::` escapes a literal
//! leading colon.

use bytesmith_core::Language;
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum BridgeCommand {
    Run {
        path: PathBuf,
        language: Option<Language>,
    },
    Stop,
    Clear,
    New,
    Status,
    Help,
    Quit,
    Invalid(String),
    Input(String),
}

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> BridgeCommand {
        let line = input.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix("::") {
            return BridgeCommand::Input(format!(":{}", rest));
        }

        let Some(rest) = line.trim_start().strip_prefix(':') else {
            return BridgeCommand::Input(line.to_string());
        };

        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some(cmd) = parts.first() else {
            return BridgeCommand::Invalid("empty command".to_string());
        };

        match *cmd {
            "run" | "r" => match parts.get(1) {
                Some(path) => {
                    let language = match parts.get(2) {
                        Some(tag) => match tag.parse::<Language>() {
                            Ok(lang) => Some(lang),
                            Err(e) => return BridgeCommand::Invalid(e),
                        },
                        None => None,
                    };
                    BridgeCommand::Run {
                        path: PathBuf::from(path),
                        language,
                    }
                }
                None => BridgeCommand::Invalid("usage: :run <file> [language]".to_string()),
            },
            "stop" => BridgeCommand::Stop,
            "clear" | "cls" => BridgeCommand::Clear,
            "new" => BridgeCommand::New,
            "status" => BridgeCommand::Status,
            "help" | "?" => BridgeCommand::Help,
            "quit" | "exit" | "q" => BridgeCommand::Quit,
            other => BridgeCommand::Invalid(format!("unknown command: :{}", other)),
        }
    }
}

pub fn help_text() -> String {
    [
        "ByteSmith console commands:",
        "",
        "  :run <file> [language]   Build and run a file (language from extension if omitted)",
        "  :stop                    Kill the running process",
        "  :clear                   Clear the console",
        "  :new                     Forget the current file and clear the console",
        "  :status                  Show file | language | status",
        "  :help                    This help message",
        "  :quit                    Stop any process and exit",
        "",
        "  Languages: Java, Python, C++, JavaScript",
        "  Any other line is sent to the running process (start it with :: for a literal ':').",
    ]
    .join("\n")
}
