use std::any::Any;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Log to stderr; stdout carries the console. `RUST_LOG` overrides
/// `default_directive` (from `--log`).
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr = std::io::stderr();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(stderr.is_terminal())
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .try_init();
}

/// Record panics in the log, then let the default hook print as usual.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        tracing::error!(
            thread = thread.name().unwrap_or("<unnamed>"),
            location = ?info.location(),
            payload = panic_message(info.payload()),
            "bridge panicked"
        );
        default_hook(info);
    }));
}

pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string payload>"
    }
}
