//! Upload progress tracking and cooperative cancellation.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{GondorError, GondorResult};

/// Receives cumulative byte counts while an upload body is produced.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, sent: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn progress(&self, sent: u64, total: u64) {
        self(sent, total)
    }
}

/// Shared cancellation flag for work that leaves temporary files behind.
///
/// An interrupt handler calls [`CancelToken::cancel`] only while the token
/// is armed (archive building, stdin spooling, uploads); outside those
/// windows there is nothing to clean up.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    armed: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Fail with [`GondorError::Interrupted`] once cancelled.
    pub fn check(&self) -> GondorResult<()> {
        if self.is_cancelled() {
            Err(GondorError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Mark cancellable work as in flight until the returned guard is dropped.
    pub fn arm(&self) -> ArmedGuard {
        self.armed.store(true, Ordering::SeqCst);
        ArmedGuard {
            armed: Arc::clone(&self.armed),
        }
    }
}

/// Disarms its [`CancelToken`] on drop.
#[derive(Debug)]
pub struct ArmedGuard {
    armed: Arc<AtomicBool>,
}

impl Drop for ArmedGuard {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

fn cancelled_error() -> io::Error {
    io::Error::other("operation cancelled")
}

/// Read-proxy that fails once its token is cancelled.
pub struct CancellableReader<R> {
    inner: R,
    cancel: CancelToken,
}

impl<R: Read> CancellableReader<R> {
    pub fn new(inner: R, cancel: CancelToken) -> Self {
        Self { inner, cancel }
    }
}

impl<R: Read> Read for CancellableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(cancelled_error());
        }
        self.inner.read(buf)
    }
}

/// Read-proxy that reports progress on every chunk and honours cancellation.
pub struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total: u64, sink: Arc<dyn ProgressSink>, cancel: CancelToken) -> Self {
        Self {
            inner,
            sent: 0,
            total,
            sink,
            cancel,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(cancelled_error());
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            self.sink.progress(self.sent, self.total);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Reads in small fixed chunks to force many callbacks.
    struct Trickle<R>(R, usize);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.1);
            self.0.read(&mut buf[..len])
        }
    }

    fn recording_sink() -> (Arc<Mutex<Vec<(u64, u64)>>>, Arc<dyn ProgressSink>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink_calls = Arc::clone(&calls);
        let sink: Arc<dyn ProgressSink> = Arc::new(move |sent: u64, total: u64| {
            sink_calls.lock().unwrap().push((sent, total));
        });
        (calls, sink)
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_total() {
        let data = vec![7u8; 10_000];
        let (calls, sink) = recording_sink();
        let mut reader = ProgressReader::new(
            Trickle(Cursor::new(data.clone()), 999),
            data.len() as u64,
            sink,
            CancelToken::new(),
        );

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);

        let calls = calls.lock().unwrap();
        assert!(calls.len() >= 10);
        assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(calls.iter().all(|&(_, total)| total == 10_000));
        assert_eq!(calls.last().unwrap().0, 10_000);
    }

    #[test]
    fn test_cancelled_reader_fails() {
        let (_calls, sink) = recording_sink();
        let cancel = CancelToken::new();
        let mut reader = ProgressReader::new(Cursor::new(vec![1u8; 64]), 64, sink, cancel.clone());

        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 16);
        cancel.cancel();
        assert!(reader.read(&mut buf).is_err());
        assert_eq!(reader.sent(), 16);
    }

    #[test]
    fn test_cancellable_reader_stops_copy() {
        let cancel = CancelToken::new();
        let mut reader = CancellableReader::new(Cursor::new(vec![3u8; 64]), cancel.clone());

        let mut buf = [0u8; 32];
        assert_eq!(reader.read(&mut buf).unwrap(), 32);
        assert!(cancel.check().is_ok());

        cancel.cancel();
        assert!(io::copy(&mut reader, &mut io::sink()).is_err());
        assert!(matches!(cancel.check(), Err(GondorError::Interrupted)));
    }

    #[test]
    fn test_arm_guard_disarms_on_drop() {
        let token = CancelToken::new();
        assert!(!token.is_armed());
        {
            let _guard = token.arm();
            assert!(token.is_armed());
        }
        assert!(!token.is_armed());
        assert!(!token.is_cancelled());
    }
}
