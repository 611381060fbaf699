use bytesmith_core::builder::{compile_command, run_command, source_dir, CommandSpec};
use bytesmith_core::console::{Console, ConsoleBuffer, ConsoleEdit, ConsoleSink};
use bytesmith_core::{ConsoleError, ConsoleEvent, Language, SessionStatus, ToolchainConfig};
use std::path::{Path, PathBuf};

// ============================================================================
// Language Tests
// ============================================================================

#[test]
fn test_language_from_path_known_extensions() {
    assert_eq!(Language::from_path(Path::new("Main.java")), Language::Java);
    assert_eq!(Language::from_path(Path::new("add.py")), Language::Python);
    assert_eq!(Language::from_path(Path::new("main.cpp")), Language::Cpp);
    assert_eq!(Language::from_path(Path::new("lib.h")), Language::Cpp);
    assert_eq!(Language::from_path(Path::new("old.c")), Language::Cpp);
    assert_eq!(Language::from_path(Path::new("app.js")), Language::JavaScript);
}

#[test]
fn test_language_from_path_unknown_is_plain_text() {
    assert_eq!(Language::from_path(Path::new("notes.txt")), Language::PlainText);
    assert_eq!(Language::from_path(Path::new("Makefile")), Language::PlainText);
}

#[test]
fn test_language_from_path_ignores_case() {
    assert_eq!(Language::from_path(Path::new("MAIN.JAVA")), Language::Java);
}

#[test]
fn test_language_parse_display_names() {
    for lang in Language::ALL {
        let parsed: Language = lang.to_string().parse().unwrap();
        assert_eq!(parsed, lang);
    }
}

#[test]
fn test_language_parse_aliases() {
    assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
    assert_eq!("CPP".parse::<Language>().unwrap(), Language::Cpp);
    assert_eq!("js".parse::<Language>().unwrap(), Language::JavaScript);
    assert_eq!("text".parse::<Language>().unwrap(), Language::PlainText);
    assert!("cobol".parse::<Language>().is_err());
}

#[test]
fn test_language_runnable() {
    assert!(Language::Java.is_runnable());
    assert!(Language::Cpp.is_runnable());
    assert!(!Language::PlainText.is_runnable());
}

// ============================================================================
// ToolchainConfig Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = ToolchainConfig::default();
    assert_eq!(config.java_compiler, "javac");
    assert_eq!(config.java_runtime, "java");
    assert_eq!(config.node, "node");
    assert_eq!(config.cpp_compiler, "g++");
    assert_eq!(config.prompt, "> ");
}

#[test]
fn test_config_partial_toml_keeps_defaults() {
    let config = ToolchainConfig::from_toml_str("python = \"pypy3\"\nprompt = \">>> \"\n").unwrap();
    assert_eq!(config.python, "pypy3");
    assert_eq!(config.prompt, ">>> ");
    assert_eq!(config.java_compiler, "javac");
}

#[test]
fn test_config_empty_toml_is_default() {
    let config = ToolchainConfig::from_toml_str("").unwrap();
    assert_eq!(config, ToolchainConfig::default());
}

#[test]
fn test_config_invalid_toml() {
    let err = ToolchainConfig::from_toml_str("python = [").unwrap_err();
    assert!(matches!(err, ConsoleError::Config(_)));
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("toolchains.toml");
    std::fs::write(&path, "node = \"/opt/node/bin/node\"\n").unwrap();

    let config = ToolchainConfig::load(&path).unwrap();
    assert_eq!(config.node, "/opt/node/bin/node");
}

#[test]
fn test_config_load_missing_file_is_io_error() {
    let err = ToolchainConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConsoleError::Io(_)));
}

// ============================================================================
// Command Builder Tests
// ============================================================================

#[test]
fn test_command_spec_display_is_simple_concatenation() {
    let spec = CommandSpec::new("java").arg("-cp").arg("/src").arg("Main");
    assert_eq!(spec.to_string(), "java -cp /src Main");
}

#[test]
#[cfg(unix)]
fn test_source_dir_of_bare_file_is_dot() {
    assert_eq!(source_dir(Path::new("add.py")), PathBuf::from("."));
    assert_eq!(source_dir(Path::new("/work/add.py")), PathBuf::from("/work"));
}

#[test]
#[cfg(unix)]
fn test_java_compile_and_run_commands() {
    let config = ToolchainConfig::default();
    let path = Path::new("/work/Main.java");

    let compile = compile_command(path, Language::Java, &config).unwrap();
    assert_eq!(compile.program, "javac");
    assert_eq!(compile.args, vec!["/work/Main.java".to_string()]);

    let run = run_command(path, Language::Java, &config).unwrap();
    assert_eq!(run.program, "java");
    assert_eq!(run.args, vec!["-cp", "/work", "Main"]);
    assert_eq!(run.cwd, Some(PathBuf::from("/work")));
}

#[test]
#[cfg(unix)]
fn test_cpp_compile_and_run_commands() {
    let config = ToolchainConfig {
        cpp_output: "prog".to_string(),
        ..ToolchainConfig::default()
    };
    let path = Path::new("/work/main.cpp");

    let compile = compile_command(path, Language::Cpp, &config).unwrap();
    assert_eq!(compile.program, "g++");
    assert_eq!(compile.args, vec!["/work/main.cpp", "-o", "/work/prog"]);

    let run = run_command(path, Language::Cpp, &config).unwrap();
    assert_eq!(run.program, "/work/prog");
    assert!(run.args.is_empty());
    assert_eq!(run.cwd, Some(PathBuf::from("/work")));
}

#[test]
fn test_interpreted_languages_have_no_compile_step() {
    let config = ToolchainConfig::default();
    assert!(compile_command(Path::new("/work/add.py"), Language::Python, &config).is_none());
    assert!(compile_command(Path::new("/work/app.js"), Language::JavaScript, &config).is_none());

    let run = run_command(Path::new("/work/app.js"), Language::JavaScript, &config).unwrap();
    assert_eq!(run.program, "node");
    assert_eq!(run.args, vec!["/work/app.js"]);
}

#[test]
fn test_plain_text_is_unsupported() {
    let config = ToolchainConfig::default();
    let err = run_command(Path::new("/work/notes.txt"), Language::PlainText, &config).unwrap_err();
    assert!(matches!(err, ConsoleError::UnsupportedLanguage(Language::PlainText)));
    assert_eq!(err.to_string(), "Run command not supported for language: Plain Text");
}

// ============================================================================
// ConsoleBuffer Tests
// ============================================================================

#[test]
fn test_buffer_starts_empty() {
    let buf = ConsoleBuffer::default();
    assert!(buf.is_empty());
    assert_eq!(buf.prompt_position(), 0);
    assert_eq!(buf.cursor(), 0);
    assert_eq!(buf.pending_input(), "");
}

#[test]
fn test_append_advances_prompt_position() {
    let mut buf = ConsoleBuffer::default();
    buf.append("hello\n");
    assert_eq!(buf.prompt_position(), 6);
    assert_eq!(buf.cursor(), 6);
    assert_eq!(buf.history(), "hello\n");
}

#[test]
fn test_open_prompt_appends_marker() {
    let mut buf = ConsoleBuffer::new("$ ");
    buf.append("out\n");
    buf.open_prompt();
    assert_eq!(buf.text(), "out\n$ ");
    assert_eq!(buf.prompt_position(), buf.len());
}

#[test]
fn test_pending_input_is_trimmed() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    assert!(buf.apply_edit(ConsoleEdit::Insert("  42 \t".to_string())));
    assert_eq!(buf.pending_raw(), "  42 \t");
    assert_eq!(buf.pending_input(), "42");
}

#[test]
fn test_append_commits_pending_text_to_history() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("abc".to_string()));
    buf.append("\n");
    assert_eq!(buf.history(), "> abc\n");
    assert_eq!(buf.pending_input(), "");
}

#[test]
fn test_prompt_position_monotonic_and_bounded() {
    let mut buf = ConsoleBuffer::default();
    let mut last = 0;
    for i in 0..50 {
        match i % 4 {
            0 => buf.append("line\n"),
            1 => buf.open_prompt(),
            2 => {
                buf.apply_edit(ConsoleEdit::Insert("typed".to_string()));
            }
            _ => {
                buf.apply_edit(ConsoleEdit::Backspace);
            }
        }
        assert!(buf.prompt_position() >= last);
        assert!(buf.prompt_position() <= buf.len());
        assert!(buf.cursor() >= buf.prompt_position());
        last = buf.prompt_position();
    }
}

#[test]
fn test_clear_resets_everything() {
    let mut buf = ConsoleBuffer::default();
    buf.append("stuff");
    buf.open_prompt();
    buf.clear();
    assert!(buf.is_empty());
    assert_eq!(buf.prompt_position(), 0);
    assert_eq!(buf.cursor(), 0);
}

// ============================================================================
// ConsoleEdit Tests (history is immutable)
// ============================================================================

#[test]
fn test_backspace_at_boundary_is_rejected() {
    let mut buf = ConsoleBuffer::default();
    buf.append("history");
    buf.open_prompt();
    let before = buf.text().to_string();
    assert!(!buf.apply_edit(ConsoleEdit::Backspace));
    assert_eq!(buf.text(), before);
}

#[test]
fn test_backspace_inside_pending_region() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("12".to_string()));
    assert!(buf.apply_edit(ConsoleEdit::Backspace));
    assert_eq!(buf.pending_raw(), "1");
    assert!(buf.apply_edit(ConsoleEdit::Backspace));
    assert!(!buf.apply_edit(ConsoleEdit::Backspace));
    assert_eq!(buf.text(), "> ");
}

#[test]
fn test_backspace_handles_multibyte_chars() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("añ".to_string()));
    assert!(buf.apply_edit(ConsoleEdit::Backspace));
    assert_eq!(buf.pending_raw(), "a");
}

#[test]
fn test_move_left_stops_at_boundary() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("ab".to_string()));
    assert!(buf.apply_edit(ConsoleEdit::MoveLeft));
    assert!(buf.apply_edit(ConsoleEdit::MoveLeft));
    assert!(!buf.apply_edit(ConsoleEdit::MoveLeft));
    assert_eq!(buf.cursor(), buf.prompt_position());
}

#[test]
fn test_insert_in_middle_of_pending() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("ac".to_string()));
    buf.apply_edit(ConsoleEdit::MoveLeft);
    buf.apply_edit(ConsoleEdit::Insert("b".to_string()));
    assert_eq!(buf.pending_raw(), "abc");
}

#[test]
fn test_delete_forward() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("xy".to_string()));
    buf.apply_edit(ConsoleEdit::Home);
    assert!(buf.apply_edit(ConsoleEdit::Delete));
    assert_eq!(buf.pending_raw(), "y");
    buf.apply_edit(ConsoleEdit::End);
    assert!(!buf.apply_edit(ConsoleEdit::Delete));
}

#[test]
fn test_move_to_history_snaps_to_end_and_is_rejected() {
    let mut buf = ConsoleBuffer::default();
    buf.append("old output\n");
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("in".to_string()));
    buf.apply_edit(ConsoleEdit::Home);

    assert!(!buf.apply_edit(ConsoleEdit::MoveTo(2)));
    assert_eq!(buf.cursor(), buf.len());

    // Typing after the snap lands at the end, history untouched.
    buf.apply_edit(ConsoleEdit::Insert("!".to_string()));
    assert_eq!(buf.history(), "old output\n> ");
    assert_eq!(buf.pending_raw(), "in!");
}

#[test]
fn test_move_to_inside_pending() {
    let mut buf = ConsoleBuffer::default();
    buf.open_prompt();
    buf.apply_edit(ConsoleEdit::Insert("abc".to_string()));
    let pos = buf.prompt_position() + 1;
    assert!(buf.apply_edit(ConsoleEdit::MoveTo(pos)));
    assert_eq!(buf.cursor(), pos);
    assert!(!buf.apply_edit(ConsoleEdit::MoveTo(buf.len() + 1)));
}

#[test]
fn test_empty_insert_is_rejected() {
    let mut buf = ConsoleBuffer::default();
    assert!(!buf.apply_edit(ConsoleEdit::Insert(String::new())));
}

// ============================================================================
// Console (update queue) Tests
// ============================================================================

#[tokio::test]
async fn test_console_pump_applies_in_order() {
    let (sink, rx) = ConsoleSink::channel();
    let mut console = Console::new(ConsoleBuffer::default(), rx);

    sink.line("first");
    sink.append("second\n");
    sink.open_prompt();
    sink.status(SessionStatus::Running);

    let applied = console.pump();
    assert_eq!(applied.len(), 4);
    assert_eq!(console.text(), "first\nsecond\n> ");
    assert_eq!(console.status(), SessionStatus::Running);
    assert!(console.pump().is_empty());
}

#[tokio::test]
async fn test_console_cleared_event() {
    let (sink, rx) = ConsoleSink::channel();
    let mut console = Console::new(ConsoleBuffer::default(), rx);

    sink.append("junk");
    sink.clear();
    console.pump();
    assert_eq!(console.text(), "");
    assert_eq!(console.buffer().prompt_position(), 0);
}

#[tokio::test]
async fn test_console_next_event_ends_when_sinks_dropped() {
    let (sink, rx) = ConsoleSink::channel();
    let mut console = Console::new(ConsoleBuffer::default(), rx);

    sink.append("x");
    drop(sink);

    assert_eq!(console.next_event().await, Some(ConsoleEvent::Append("x".to_string())));
    assert_eq!(console.next_event().await, None);
}

#[tokio::test]
async fn test_concurrent_producers_never_tear_prompt_position() {
    let (sink, rx) = ConsoleSink::channel();
    let mut console = Console::new(ConsoleBuffer::default(), rx);

    let mut tasks = Vec::new();
    for t in 0..4 {
        let sink = sink.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                sink.line(&format!("t{}-{}", t, i));
                if i % 5 == 0 {
                    sink.open_prompt();
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    console.pump();
    let buf = console.buffer();
    assert_eq!(buf.prompt_position(), buf.len());
    for t in 0..4 {
        // Per-producer order is preserved.
        let a = buf.text().find(&format!("t{}-3\n", t)).unwrap();
        let b = buf.text().find(&format!("t{}-24\n", t)).unwrap();
        assert!(a < b);
    }
}
