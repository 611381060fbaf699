//! Process supervisor.
//!
//! Owns the single process slot. A live process gets three cooperating tasks
//! tied to one cancellation token:
//! - stdout reader and stderr reader, one console line per output line
//! - exit waiter, which reaps the child and releases the slot
//!
//! Input goes through a fourth task that owns the child's stdin, so a child
//! that stops reading never blocks the caller.
//!
//! `terminate()` cancels the token, so a kill reaches every task.
//! Order is preserved within a stream, not between stdout and stderr.

use crate::builder::CommandSpec;
use crate::console::ConsoleSink;
use crate::error::{ConsoleError, Result};
use crate::SessionStatus;

use parking_lot::Mutex;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lines queued for a child that is not reading its input yet.
pub const INPUT_QUEUE_DEPTH: usize = 64;

/// How long output may keep arriving after the child itself has exited.
/// Pipes inherited by a background grandchild are abandoned after this.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// The live child as seen by everyone except the exit waiter, which owns the
/// `Child` itself. Dropping the handle closes the input queue, and with it
/// the child's stdin.
#[derive(Debug)]
struct ProcessHandle {
    generation: u64,
    pid: Option<u32>,
    command: CommandSpec,
    input: mpsc::Sender<String>,
    cancel: CancellationToken,
    started: Instant,
}

#[derive(Debug)]
enum SlotState {
    Idle,
    /// Reserved by a run whose compile step is in flight. The token is
    /// cancelled when the user stops the build.
    Building(CancellationToken),
    Running(ProcessHandle),
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    /// Generation of a killed process not yet reaped by its waiter.
    stopping: Option<u64>,
    next_generation: u64,
}

impl Slot {
    fn status(&self) -> SessionStatus {
        match &self.state {
            SlotState::Running(_) => SessionStatus::Running,
            SlotState::Building(cancel) if cancel.is_cancelled() => SessionStatus::Stopping,
            SlotState::Building(_) => SessionStatus::Building,
            SlotState::Idle if self.stopping.is_some() => SessionStatus::Stopping,
            SlotState::Idle => SessionStatus::Idle,
        }
    }

    fn holds(&self, generation: u64) -> bool {
        matches!(&self.state, SlotState::Running(h) if h.generation == generation)
    }
}

/// Claim on the empty slot, held while the command is being built.
///
/// Consumed by [`ProcessSupervisor::spawn`]. Dropping it unused hands the
/// slot back and reports `Idle`.
#[derive(Debug)]
pub struct Reservation {
    slot: Arc<Mutex<Slot>>,
    console: ConsoleSink,
    cancel: CancellationToken,
    armed: bool,
}

impl Reservation {
    /// Resolves once the build has been stopped.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let released = {
            let mut slot = self.slot.lock();
            if matches!(slot.state, SlotState::Building(_)) {
                slot.state = SlotState::Idle;
                true
            } else {
                false
            }
        };
        if released {
            self.console.status(SessionStatus::Idle);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    slot: Arc<Mutex<Slot>>,
    console: ConsoleSink,
}

impl ProcessSupervisor {
    pub fn new(console: ConsoleSink) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                state: SlotState::Idle,
                stopping: None,
                next_generation: 1,
            })),
            console,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.slot.lock().status()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.slot.lock().state, SlotState::Running(_))
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.slot.lock().state {
            SlotState::Running(handle) => handle.pid,
            _ => None,
        }
    }

    /// Claim the slot. Fails with `AlreadyRunning` unless it is empty.
    pub fn reserve(&self) -> Result<Reservation> {
        let cancel = CancellationToken::new();
        {
            let mut slot = self.slot.lock();
            if !matches!(slot.state, SlotState::Idle) {
                return Err(ConsoleError::AlreadyRunning);
            }
            slot.state = SlotState::Building(cancel.clone());
        }
        self.console.status(SessionStatus::Building);

        Ok(Reservation {
            slot: self.slot.clone(),
            console: self.console.clone(),
            cancel,
            armed: true,
        })
    }

    /// Start `spec` with piped stdio in the reserved slot.
    ///
    /// Opens a fresh prompt before any output can arrive, then starts the
    /// reader, writer and waiter tasks. Returns the child's pid when the OS
    /// reports one. A reservation whose build was stopped fails with
    /// `Cancelled` and leaves nothing running.
    pub fn spawn(&self, mut reservation: Reservation, spec: &CommandSpec) -> Result<Option<u32>> {
        if reservation.is_cancelled() {
            return Err(ConsoleError::Cancelled);
        }

        let mut cmd = spec.to_command();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ConsoleError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(ConsoleError::Io(std::io::Error::other(
                "child process is missing a piped stream",
            )));
        };

        let pid = child.id();
        let cancel = CancellationToken::new();
        let (input, queued) = mpsc::channel(INPUT_QUEUE_DEPTH);

        let generation = {
            let mut slot = self.slot.lock();
            // A stop can land between the build finishing and this point.
            // The child is killed when it drops.
            if reservation.is_cancelled() {
                return Err(ConsoleError::Cancelled);
            }
            let generation = slot.next_generation;
            slot.next_generation += 1;
            slot.state = SlotState::Running(ProcessHandle {
                generation,
                pid,
                command: spec.clone(),
                input,
                cancel: cancel.clone(),
                started: Instant::now(),
            });
            generation
        };
        reservation.armed = false;

        tracing::info!(pid = ?pid, generation, command = %spec, "Process spawned");
        self.console.status(SessionStatus::Running);
        self.console.open_prompt();

        tokio::spawn(feed_stdin(stdin, queued, cancel.child_token()));

        let out_task = tokio::spawn(pump_stream(
            stdout,
            "stdout",
            generation,
            self.slot.clone(),
            self.console.clone(),
            cancel.child_token(),
        ));
        let err_task = tokio::spawn(pump_stream(
            stderr,
            "stderr",
            generation,
            self.slot.clone(),
            self.console.clone(),
            cancel.child_token(),
        ));

        tokio::spawn(wait_for_exit(
            child,
            [out_task, err_task],
            cancel,
            generation,
            self.slot.clone(),
            self.console.clone(),
        ));

        Ok(pid)
    }

    /// Queue `line` plus a newline for the child's stdin.
    ///
    /// Never waits on the child: a child that has stopped reading fills the
    /// queue and further lines are refused with `InputBacklog`.
    pub fn write_line(&self, line: &str) -> Result<()> {
        let input = {
            let slot = self.slot.lock();
            match &slot.state {
                SlotState::Running(handle) => handle.input.clone(),
                _ => return Err(ConsoleError::NoProcess),
            }
        };

        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');

        input.try_send(data).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ConsoleError::InputBacklog,
            mpsc::error::TrySendError::Closed(_) => ConsoleError::NoProcess,
        })
    }

    /// Kill the running process, if any, and release the slot immediately.
    ///
    /// Returns `false` (and does nothing) when no process is running. Once
    /// this returns, no further output from the process reaches the console.
    pub fn terminate(&self) -> bool {
        let handle = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut slot.state, SlotState::Idle) {
                SlotState::Running(handle) => {
                    slot.stopping = Some(handle.generation);
                    handle
                }
                other => {
                    slot.state = other;
                    return false;
                }
            }
        };

        tracing::info!(
            pid = ?handle.pid,
            generation = handle.generation,
            command = %handle.command,
            elapsed_ms = handle.started.elapsed().as_millis() as u64,
            "Terminating process"
        );
        handle.cancel.cancel();
        self.console.status(SessionStatus::Stopping);
        true
    }

    /// Stop a build in flight. The run that holds the reservation gives the
    /// slot back once it notices. `false` when nothing is building.
    pub fn cancel_build(&self) -> bool {
        let cancelled = {
            let slot = self.slot.lock();
            match &slot.state {
                SlotState::Building(cancel) if !cancel.is_cancelled() => {
                    cancel.cancel();
                    true
                }
                _ => false,
            }
        };

        if cancelled {
            tracing::info!("Build cancelled");
            self.console.status(SessionStatus::Stopping);
        }
        cancelled
    }
}

// ════════════════════════════════════════════════════════════════════
// Background tasks
// ════════════════════════════════════════════════════════════════════

/// Forward one stream to the console line by line until EOF, a read error,
/// or cancellation. None of those reach the console.
///
/// A line is only forwarded while `generation` still holds the slot, checked
/// under the slot lock, so nothing slips in behind a stop or an exit report.
async fn pump_stream<R>(
    stream: R,
    name: &'static str,
    generation: u64,
    slot: Arc<Mutex<Slot>>,
    console: ConsoleSink,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(stream = name, "Reader cancelled");
                break;
            }
            read = read_line_lossy(&mut reader) => read,
        };

        match read {
            Ok(Some(line)) => {
                let gate = slot.lock();
                if !gate.holds(generation) {
                    tracing::debug!(stream = name, generation, "Reader outlived its process");
                    break;
                }
                console.line(&line);
            }
            Ok(None) => {
                tracing::debug!(stream = name, "Reader reached end of stream");
                break;
            }
            Err(e) => {
                tracing::debug!(stream = name, error = %e, "Reader stopped on read error");
                break;
            }
        }
    }
}

/// Next line without its terminator. Invalid UTF-8 is replaced, not fatal.
async fn read_line_lossy<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Write queued lines to the child in order, flushing after each one.
async fn feed_stdin(
    mut stdin: ChildStdin,
    mut queued: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = queued.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        };
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            written = write => written,
        };

        if let Err(e) = written {
            tracing::debug!(error = %e, "Stdin writer stopped on write error");
            break;
        }
    }
    tracing::debug!("Stdin writer finished");
}

async fn wait_for_exit(
    mut child: Child,
    readers: [JoinHandle<()>; 2],
    cancel: CancellationToken,
    generation: u64,
    slot: Arc<Mutex<Slot>>,
    console: ConsoleSink,
) {
    let exited = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        status = child.wait() => Some(status),
    };

    let join = async move {
        for reader in readers {
            let _ = reader.await;
        }
    };

    match exited {
        None => {
            match child.kill().await {
                Ok(()) => tracing::info!(generation, "Process killed"),
                Err(e) => tracing::warn!(generation, error = %e, "Failed to kill process"),
            }
            join.await;
        }
        Some(_) => {
            // Let output already in the pipes land before the exit line. A
            // background grandchild can keep the pipes open indefinitely.
            if tokio::time::timeout(EXIT_DRAIN_GRACE, join).await.is_err() {
                tracing::debug!(generation, "Output still open after exit, detaching readers");
            }
            cancel.cancel();
        }
    }

    let message = match &exited {
        Some(Ok(status)) => {
            tracing::info!(generation, code = ?status.code(), "Process exited");
            describe_exit(status)
        }
        Some(Err(e)) => {
            tracing::warn!(generation, error = %e, "Waiting on process failed");
            format!("Process wait failed: {}", e)
        }
        None => "Process killed".to_string(),
    };

    // Reported under the lock so no new run can interleave with the exit.
    let mut slot = slot.lock();
    if slot.holds(generation) {
        slot.state = SlotState::Idle;
        console.append(format!("\n{}\n", message));
        console.status(SessionStatus::Idle);
        console.open_prompt();
    } else if slot.stopping == Some(generation) {
        // A stopped process was already announced by whoever stopped it.
        slot.stopping = None;
        if matches!(slot.state, SlotState::Idle) {
            console.status(SessionStatus::Idle);
        }
    }
}

pub fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("Process finished with exit code: {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("Process terminated by signal: {}", signal);
        }
    }

    "Process finished without an exit code".to_string()
}
