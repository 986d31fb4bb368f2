//! Non-blocking handle on a spawned agent process.

use std::io;
use std::process::{Child, ExitStatus};
use std::time::Duration;
use wait_timeout::ChildExt;

/// A running (or exited) agent process.
///
/// On unix the agent leads its own process group, so `terminate` and `kill`
/// reach the helper processes it spawns as well.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    pub(crate) fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            exit_code: None,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit code if the process has finished, `None` while it is still running.
    pub fn poll(&mut self) -> io::Result<Option<i32>> {
        if self.exit_code.is_some() {
            return Ok(self.exit_code);
        }
        let status = self.child.try_wait()?;
        Ok(self.record(status))
    }

    /// Ask the process (group) to stop: SIGTERM on unix.
    #[cfg(unix)]
    pub fn terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if self.exit_code.is_some() {
            return Ok(());
        }
        let pgid = Pid::from_raw(self.pid as i32);
        match killpg(pgid, Signal::SIGTERM) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    /// Platforms without signals only have the forced kill.
    #[cfg(not(unix))]
    pub fn terminate(&mut self) -> io::Result<()> {
        self.kill()
    }

    /// Forcefully stop the process (group).
    pub fn kill(&mut self) -> io::Result<()> {
        if self.exit_code.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;
            let _ = killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL);
        }

        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already exited but not yet reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Block for at most `timeout` waiting for the process to exit.
    pub fn wait(&mut self, timeout: Duration) -> io::Result<Option<i32>> {
        if self.exit_code.is_some() {
            return Ok(self.exit_code);
        }
        let status = self.child.wait_timeout(timeout)?;
        Ok(self.record(status))
    }

    fn record(&mut self, status: Option<ExitStatus>) -> Option<i32> {
        if let Some(status) = status {
            self.exit_code = Some(exit_code_of(status));
        }
        self.exit_code
    }
}

/// Numeric exit code, using the shell's `128 + signal` convention for
/// processes ended by a signal.
pub(crate) fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};
    use std::time::Instant;

    fn spawn(script: &str) -> ProcessHandle {
        let child = Command::new("sh")
            .args(["-c", script])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .unwrap();
        ProcessHandle::new(child)
    }

    #[test]
    fn test_poll_reports_exit_code() {
        let mut handle = spawn("exit 3");
        assert_eq!(handle.wait(Duration::from_secs(10)).unwrap(), Some(3));
        assert_eq!(handle.poll().unwrap(), Some(3));
    }

    #[test]
    fn test_poll_running_process() {
        let mut handle = spawn("sleep 30");
        assert_eq!(handle.poll().unwrap(), None);
        handle.kill().unwrap();
        assert!(handle.wait(Duration::from_secs(10)).unwrap().is_some());
    }

    #[test]
    fn test_terminate_stops_cooperative_process() {
        let mut handle = spawn("sleep 30");
        handle.terminate().unwrap();
        let code = handle.wait(Duration::from_secs(10)).unwrap();
        assert_eq!(code, Some(128 + 15));
    }

    #[test]
    fn test_kill_stops_process_ignoring_sigterm() {
        let mut handle = spawn("trap '' TERM; sleep 30");
        handle.terminate().unwrap();
        assert_eq!(handle.wait(Duration::from_millis(300)).unwrap(), None);

        let started = Instant::now();
        handle.kill().unwrap();
        let code = handle.wait(Duration::from_secs(10)).unwrap();
        assert_eq!(code, Some(128 + 9));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_signals_after_exit_are_noops() {
        let mut handle = spawn("true");
        assert_eq!(handle.wait(Duration::from_secs(10)).unwrap(), Some(0));
        handle.terminate().unwrap();
        handle.kill().unwrap();
        assert_eq!(handle.poll().unwrap(), Some(0));
    }
}
