/*!
 * Worker Process
 *
 * A forked child that runs one job and publishes its [`ExecutionResult`]
 * exactly once over a Unix socket pair, then exits with `_exit`.
 *
 * ## Result Slot
 *
 * The socket carries a single versioned frame. The slot counts as published
 * once a complete frame has been read. A frame that fails to decode is handled
 * like an outcome that failed to encode in the child: the slot stays
 * unpublished and the caller eventually times out.
 *
 * ## Cancellation
 *
 * [`Worker::cancel`] is deliberately asymmetric: a live worker is killed
 * (SIGKILL, no graceful shutdown) and the call returns normally; a worker that
 * is no longer alive, or never started, makes `cancel` return the configured
 * timeout error instead.
 */

use super::types::ExecutionResult;
use crate::core::errors::{ErrorKind, ExecutionFault};
use crate::core::limits::{CHANNEL_READ_CHUNK, WORKER_EXIT_CHANNEL_FAILED, WORKER_EXIT_OK};
use crate::core::serialization::{decode_frame, encode_frame, frame_len};
use nix::libc;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use serde::{de::DeserializeOwned, Serialize};
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of one receive on the slot
#[derive(Debug)]
pub enum Slot<T, K> {
    /// A complete frame arrived
    Published(ExecutionResult<T, K>),

    /// Nothing complete yet (or nothing will ever arrive)
    Empty,
}

/// Handle to a forked worker and the read end of its result channel
pub struct Worker {
    pid: Option<Pid>,
    channel: Option<UnixStream>,
    buffer: Vec<u8>,
    /// Read scratch, allocated once per worker
    chunk: Vec<u8>,
    reaped: bool,
}

impl Worker {
    /// Fork a worker running `job`
    pub fn spawn<T, K, J>(job: J) -> Result<Self, ExecutionFault>
    where
        T: Serialize,
        K: Serialize,
        J: FnOnce() -> Result<T, K>,
    {
        let (parent_end, child_end) =
            UnixStream::pair().map_err(|e| ExecutionFault::Channel(e.to_string()))?;

        // SAFETY: the child only runs the job, writes one frame and `_exit`s.
        match unsafe { fork() } {
            Err(errno) => Err(ExecutionFault::Spawn(errno.to_string())),
            Ok(ForkResult::Child) => {
                drop(parent_end);
                run_worker(child_end, job)
            }
            Ok(ForkResult::Parent { child }) => {
                drop(child_end);
                debug!(pid = child.as_raw(), "worker spawned");
                Ok(Self {
                    pid: Some(child),
                    channel: Some(parent_end),
                    buffer: Vec::new(),
                    chunk: vec![0u8; CHANNEL_READ_CHUNK],
                    reaped: false,
                })
            }
        }
    }

    /// Handle for a worker that never started
    pub fn unstarted() -> Self {
        Self {
            pid: None,
            channel: None,
            buffer: Vec::new(),
            chunk: Vec::new(),
            reaped: false,
        }
    }

    /// OS process id, if the worker was started
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    /// Whether the result channel can still deliver data
    pub fn channel_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Whether the worker process is still running
    ///
    /// A worker that exited is reaped here.
    pub fn is_alive(&mut self) -> bool {
        let Some(pid) = self.pid else {
            return false;
        };
        if self.reaped {
            return false;
        }

        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(status) => {
                debug!(pid = pid.as_raw(), ?status, "worker exited");
                self.reaped = true;
                false
            }
            Err(errno) => {
                warn!(pid = pid.as_raw(), error = %errno, "waitpid failed, treating worker as gone");
                self.reaped = true;
                false
            }
        }
    }

    /// Wait up to `wait` for the slot to be published
    pub fn receive<T, K>(&mut self, wait: Duration) -> Slot<T, K>
    where
        T: DeserializeOwned,
        K: DeserializeOwned,
    {
        let Some(channel) = self.channel.as_mut() else {
            std::thread::sleep(wait);
            return Slot::Empty;
        };

        if let Err(e) = channel.set_read_timeout(Some(wait.max(Duration::from_micros(1)))) {
            warn!(error = %e, "failed to set channel read timeout");
        }

        let mut closed = false;
        loop {
            match channel.read(&mut self.chunk) {
                Ok(0) => {
                    closed = true;
                    break;
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&self.chunk[..n]);
                    if frame_len(&self.buffer).is_some_and(|len| self.buffer.len() >= len) {
                        break;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        IoErrorKind::WouldBlock | IoErrorKind::TimedOut | IoErrorKind::Interrupted
                    ) =>
                {
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "result channel read failed");
                    closed = true;
                    break;
                }
            }
        }

        if frame_len(&self.buffer).is_some_and(|len| self.buffer.len() >= len) {
            let frame = std::mem::take(&mut self.buffer);
            self.channel = None;
            debug!(bytes = frame.len(), "worker result received");
            return match decode_frame::<ExecutionResult<T, K>>(&frame) {
                Ok(result) => Slot::Published(result),
                Err(e) => {
                    warn!(error = %e, "worker result could not be decoded");
                    Slot::Published(ExecutionResult::Unserializable(e.to_string()))
                }
            };
        }

        if closed {
            if !self.buffer.is_empty() {
                warn!(bytes = self.buffer.len(), "worker closed the channel mid-frame");
            }
            self.buffer.clear();
            self.channel = None;
        }
        Slot::Empty
    }

    /// Forcibly terminate a live worker, or fail with the timeout error
    pub fn cancel<K: ErrorKind>(&mut self, message: Option<&str>) -> Result<(), K> {
        if self.is_alive() {
            self.terminate();
            Ok(())
        } else {
            Err(K::timed_out(message))
        }
    }

    /// SIGKILL and reap
    pub fn terminate(&mut self) {
        let Some(pid) = self.pid else {
            return;
        };
        if self.reaped {
            return;
        }

        if let Err(errno) = kill(pid, Signal::SIGKILL) {
            warn!(pid = pid.as_raw(), error = %errno, "failed to kill worker");
        }
        if let Err(errno) = waitpid(pid, None) {
            warn!(pid = pid.as_raw(), error = %errno, "failed to reap worker");
        }
        self.reaped = true;
        self.channel = None;
        warn!(pid = pid.as_raw(), "worker terminated");
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("pid", &self.pid)
            .field("channel_open", &self.channel.is_some())
            .field("buffered", &self.buffer.len())
            .field("reaped", &self.reaped)
            .finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.is_alive() {
            self.terminate();
        }
    }
}

/// Child side: run, publish once, exit without unwinding into the parent's stack
fn run_worker<T, K, J>(mut channel: UnixStream, job: J) -> !
where
    T: Serialize,
    K: Serialize,
    J: FnOnce() -> Result<T, K>,
{
    let outcome = ExecutionResult::capture(job);

    let frame = encode_frame(&outcome).or_else(|e| {
        encode_frame(&ExecutionResult::<T, K>::Unserializable(e.to_string()))
    });

    let code = match frame {
        Ok(frame) => match channel.write_all(&frame).and_then(|_| channel.flush()) {
            Ok(()) => WORKER_EXIT_OK,
            Err(_) => WORKER_EXIT_CHANNEL_FAILED,
        },
        Err(_) => WORKER_EXIT_CHANNEL_FAILED,
    };

    drop(channel);
    // SAFETY: `_exit` skips atexit handlers and destructors inherited from the parent.
    unsafe { libc::_exit(code) }
}
