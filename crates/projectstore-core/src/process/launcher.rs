//! Child process lifecycle and output streaming

use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::error::{ProcessError, ProcessResult};
use crate::project::StoreConfig;

/// Lines buffered between the reader threads and the consumer
const OUTPUT_CAPACITY: usize = 1024;

/// How often waiting polls the child
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// One line of child output, without its line terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Source pipe
    pub stream: OutputStream,
    /// Line text, lossily decoded as UTF-8
    pub text: String,
}

/// What to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Working directory, inherited when unset
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Command without arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir`
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Cooperative cancellation flag shared with a UI
///
/// Flipping it makes the next [`ProcessHandle::wait_timeout`] terminate the
/// child.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    /// Fresh, unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Starts child processes with piped output
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    grace_period: Duration,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(2000),
        }
    }
}

impl ProcessLauncher {
    /// Launcher with the default two second grace period
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher using the store's grace period setting
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new().with_grace_period(Duration::from_millis(config.terminate_grace_ms))
    }

    /// Time a terminated child gets before it is killed
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Spawn the command and start draining its output
    pub fn start(&self, spec: &CommandSpec) -> ProcessResult<ProcessHandle> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        tracing::debug!("Started {} (pid {})", spec.program, child.id());

        let (tx, rx) = crossbeam_channel::bounded(OUTPUT_CAPACITY);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, OutputStream::Stderr, tx));
        }

        Ok(ProcessHandle {
            program: spec.program.clone(),
            child,
            lines: rx,
            pending: VecDeque::new(),
            readers,
            grace_period: self.grace_period,
            stop: StopToken::new(),
            status: None,
        })
    }
}

/// Read `pipe` line by line until EOF or until nobody listens
fn spawn_reader<R>(pipe: R, stream: OutputStream, tx: Sender<OutputLine>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    let line = OutputLine {
                        stream,
                        text: String::from_utf8_lossy(&buf).into_owned(),
                    };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Error reading child {stream:?}: {e}");
                    break;
                }
            }
        }
    })
}

/// A running (or finished) child process
pub struct ProcessHandle {
    program: String,
    child: Child,
    lines: Receiver<OutputLine>,
    /// Lines pulled off the channel while waiting, served before the channel
    pending: VecDeque<OutputLine>,
    readers: Vec<JoinHandle<()>>,
    grace_period: Duration,
    stop: StopToken,
    status: Option<ExitStatus>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .field("status", &self.status)
            .finish()
    }
}

impl ProcessHandle {
    /// OS process id
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Token that stops this process when flipped
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Next output line
    ///
    /// Returns `None` on timeout and once both pipes are closed and drained.
    pub fn next_line(&mut self, timeout: Duration) -> Option<OutputLine> {
        if let Some(line) = self.pending.pop_front() {
            return Some(line);
        }
        self.lines.recv_timeout(timeout).ok()
    }

    /// Move output from the channel into `pending` for up to `timeout`
    ///
    /// Keeps the reader threads, and with them the child, from blocking on a
    /// full channel while nobody consumes lines.
    fn buffer_output(&mut self, timeout: Duration) {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => {
                self.pending.push_back(line);
                self.pending.extend(self.lines.try_iter());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(timeout),
        }
    }

    /// Exit status if the child has finished, without blocking
    pub fn try_wait(&mut self) -> ProcessResult<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status)
    }

    /// Wait up to `timeout` for the child to exit
    ///
    /// Honors the stop token: once it is flipped the child is terminated and
    /// its final status returned.
    pub fn wait_timeout(&mut self, timeout: Duration) -> ProcessResult<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if self.stop.is_stopped() {
                tracing::debug!("Stop requested for {}", self.program);
                return self.stop_now();
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.buffer_output(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Terminate on request; a child that exited in the meantime is not an error
    fn stop_now(&mut self) -> ProcessResult<Option<ExitStatus>> {
        match self.terminate() {
            Ok(status) => Ok(Some(status)),
            Err(ProcessError::AlreadyFinished) => Ok(self.status),
            Err(err) => Err(err),
        }
    }

    /// Block until the child exits
    ///
    /// Output produced meanwhile stays available through [`ProcessHandle::next_line`].
    pub fn wait(&mut self) -> ProcessResult<ExitStatus> {
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(status);
            }
            self.buffer_output(POLL_INTERVAL);
        }
    }

    /// Collect all remaining output, then wait for the exit status
    pub fn wait_with_output(mut self) -> ProcessResult<(ExitStatus, Vec<OutputLine>)> {
        let mut lines: Vec<OutputLine> = self.pending.drain(..).collect();
        lines.extend(self.lines.iter());
        let status = self.wait()?;
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        Ok((status, lines))
    }

    /// Ask the child to exit, killing it after the grace period
    pub fn terminate(&mut self) -> ProcessResult<ExitStatus> {
        if self.try_wait()?.is_some() {
            return Err(ProcessError::AlreadyFinished);
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            // The pid stays reserved for our child until it is reaped
            let pid = Pid::from_raw(self.child.id() as i32);
            match kill(pid, Signal::SIGTERM) {
                Err(e) => tracing::warn!("Could not send SIGTERM to {}: {e}", self.program),
                Ok(()) => {
                    let deadline = Instant::now() + self.grace_period;
                    while Instant::now() < deadline {
                        if let Some(status) = self.try_wait()? {
                            tracing::debug!("{} exited after SIGTERM", self.program);
                            return Ok(status);
                        }
                        self.buffer_output(POLL_INTERVAL);
                    }
                    tracing::warn!(
                        "{} ignored SIGTERM for {:?}, killing",
                        self.program,
                        self.grace_period
                    );
                }
            }
        }

        self.kill()
    }

    /// Kill the child immediately
    pub fn kill(&mut self) -> ProcessResult<ExitStatus> {
        if self.try_wait()?.is_some() {
            return Err(ProcessError::AlreadyFinished);
        }
        self.child.kill()?;
        self.wait()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if matches!(self.try_wait(), Ok(None)) {
            tracing::debug!("Killing {} on drop", self.program);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").args(["-c", script])
    }

    #[test]
    fn test_output_split_by_stream() {
        let handle = ProcessLauncher::new()
            .start(&sh("echo out; echo err 1>&2"))
            .unwrap();
        let (status, lines) = handle.wait_with_output().unwrap();

        assert!(status.success());
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stdout,
            text: "out".to_string(),
        }));
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stderr,
            text: "err".to_string(),
        }));
    }

    #[test]
    fn test_next_line_none_after_exit() {
        let mut handle = ProcessLauncher::new().start(&sh("echo one")).unwrap();
        let line = handle.next_line(Duration::from_secs(5)).unwrap();
        assert_eq!(line.text, "one");
        handle.wait().unwrap();
        assert_eq!(handle.next_line(Duration::from_secs(5)), None);
    }

    #[test]
    fn test_wait_does_not_depend_on_reader() {
        let mut handle = ProcessLauncher::new()
            .start(&sh("seq 1 200000; exit 0"))
            .unwrap();
        let status = handle.wait().unwrap();
        assert!(status.success());

        let mut count = 0;
        let mut last = None;
        while let Some(line) = handle.next_line(Duration::from_secs(5)) {
            count += 1;
            last = Some(line.text);
        }
        assert_eq!(count, 200000);
        assert_eq!(last.as_deref(), Some("200000"));
    }

    #[test]
    fn test_wait_timeout_keeps_output_flowing() {
        let mut handle = ProcessLauncher::new()
            .start(&sh("seq 1 50000"))
            .unwrap();
        let status = handle.wait_timeout(Duration::from_secs(30)).unwrap();
        assert!(status.is_some_and(|s| s.success()));
        assert_eq!(handle.next_line(Duration::from_secs(5)).unwrap().text, "1");
    }

    #[test]
    fn test_stop_after_exit_reports_status() {
        let mut handle = ProcessLauncher::new().start(&sh("exit 0")).unwrap();
        // let the child exit without reaping it
        thread::sleep(Duration::from_millis(300));
        let status = handle.stop_now().unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn test_spawn_failure() {
        let err = ProcessLauncher::new()
            .start(&CommandSpec::new("/nonexistent/definitely-not-a-program"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn test_terminate_running_child() {
        let mut handle = ProcessLauncher::new()
            .with_grace_period(Duration::from_millis(500))
            .start(&CommandSpec::new("sleep").arg("30"))
            .unwrap();
        let status = handle.terminate().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_kill_finished_child() {
        let mut handle = ProcessLauncher::new().start(&sh("exit 3")).unwrap();
        let status = handle.wait().unwrap();
        assert_eq!(status.code(), Some(3));
        assert!(matches!(handle.kill(), Err(ProcessError::AlreadyFinished)));
    }

    #[test]
    fn test_stop_token_ends_wait() {
        let mut handle = ProcessLauncher::new()
            .with_grace_period(Duration::from_millis(500))
            .start(&CommandSpec::new("sleep").arg("30"))
            .unwrap();
        assert_eq!(handle.wait_timeout(Duration::from_millis(50)).unwrap(), None);

        handle.stop_token().stop();
        let status = handle.wait_timeout(Duration::from_secs(10)).unwrap();
        assert!(status.is_some_and(|s| !s.success()));
    }

    #[test]
    fn test_cwd_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let spec = sh("echo \"$GREETING\"; pwd")
            .env("GREETING", "hello")
            .current_dir(dir.path());
        let (_, lines) = ProcessLauncher::new().start(&spec).unwrap().wait_with_output().unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        assert_eq!(texts[0], "hello");
        let reported = std::fs::canonicalize(texts[1]).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }
}
