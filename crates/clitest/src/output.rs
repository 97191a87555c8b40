//! Thread-safe append-only output buffer.
//!
//! One [`OutputBuffer`] holds everything a child process wrote to one of its
//! streams. It has a single writer (the stream pump, or the synchronous run
//! path) and any number of readers. Every append bumps a generation counter
//! and wakes readers blocked in [`OutputBuffer::wait_for_append`].

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mutable state behind the buffer's mutex.
#[derive(Default)]
struct BufferState {
    /// Accumulated text.
    content: String,
    /// Incremented on every successful append.
    generation: u64,
    /// Set once the owning process is finished; appends are then dropped.
    sealed: bool,
    /// Read error reported by the writer.
    fault: Option<Arc<std::io::Error>>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<BufferState>,
    changed: Condvar,
}

/// A cloneable handle to a shared, append-only text buffer.
///
/// Readers always observe a prefix of the final content: text is only ever
/// appended, and each append happens under the mutex as a unit.
#[derive(Clone, Default)]
pub struct OutputBuffer {
    shared: Arc<Shared>,
}

impl OutputBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // A panicking reader cannot leave the text half-written.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append text to the buffer.
    ///
    /// Returns `false` if the buffer was already sealed and the text was
    /// discarded.
    pub fn append(&self, text: &str) -> bool {
        let mut state = self.lock();
        if state.sealed {
            return false;
        }
        state.content.push_str(text);
        state.generation += 1;
        drop(state);
        self.shared.changed.notify_all();
        true
    }

    /// Append raw bytes, replacing invalid UTF-8 sequences.
    pub fn append_bytes(&self, bytes: &[u8]) -> bool {
        self.append(&String::from_utf8_lossy(bytes))
    }

    /// Get a consistent copy of the current content.
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.lock().content.clone()
    }

    /// Run a closure against the current content without copying it.
    pub fn with_content<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        f(&self.lock().content)
    }

    /// Evaluate `f` on the content and report the generation and sealed
    /// flag observed under the same lock.
    pub(crate) fn observe<F>(&self, f: F) -> Observation
    where
        F: FnOnce(&str) -> bool,
    {
        let state = self.lock();
        Observation {
            matched: f(&state.content),
            generation: state.generation,
            sealed: state.sealed,
        }
    }

    /// Get the current length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().content.len()
    }

    /// Check if nothing has been captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().content.is_empty()
    }

    /// Number of appends performed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Freeze the buffer. Later appends are discarded.
    pub fn seal(&self) {
        let mut state = self.lock();
        state.sealed = true;
        drop(state);
        self.shared.changed.notify_all();
    }

    /// Check if the buffer is frozen.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Record a read error from the writer side.
    pub fn set_fault(&self, error: std::io::Error) {
        let mut state = self.lock();
        if state.fault.is_none() {
            state.fault = Some(Arc::new(error));
        }
        drop(state);
        self.shared.changed.notify_all();
    }

    /// Get the recorded read error, if any.
    #[must_use]
    pub fn fault(&self) -> Option<Arc<std::io::Error>> {
        self.lock().fault.clone()
    }

    /// Block until an append newer than `seen` happens, the buffer is
    /// sealed, or `timeout` elapses. Returns the current generation.
    pub fn wait_for_append(&self, seen: u64, timeout: Duration) -> u64 {
        let state = self.lock();
        let (state, _) = self
            .shared
            .changed
            .wait_timeout_while(state, timeout, |s| s.generation == seen && !s.sealed)
            .unwrap_or_else(PoisonError::into_inner);
        state.generation
    }
}

/// Result of [`OutputBuffer::observe`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Observation {
    pub(crate) matched: bool,
    pub(crate) generation: u64,
    pub(crate) sealed: bool,
}

impl fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("OutputBuffer")
            .field("len", &state.content.len())
            .field("generation", &state.generation)
            .field("sealed", &state.sealed)
            .field("faulted", &state.fault.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn basic_append() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert!(buf.append("hello "));
        assert!(buf.append("world\n"));
        assert_eq!(buf.snapshot(), "hello world\n");
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.generation(), 2);
    }

    #[test]
    fn lossy_bytes() {
        let buf = OutputBuffer::new();
        buf.append_bytes(b"ok \xff\n");
        assert_eq!(buf.snapshot(), "ok \u{fffd}\n");
    }

    #[test]
    fn sealed_buffer_rejects_appends() {
        let buf = OutputBuffer::new();
        buf.append("before\n");
        buf.seal();
        assert!(buf.is_sealed());
        assert!(!buf.append("after\n"));
        assert_eq!(buf.snapshot(), "before\n");
    }

    #[test]
    fn clones_share_content() {
        let writer = OutputBuffer::new();
        let reader = writer.clone();
        writer.append("shared");
        assert_eq!(reader.snapshot(), "shared");
    }

    #[test]
    fn first_fault_wins() {
        let buf = OutputBuffer::new();
        buf.set_fault(std::io::Error::other("first"));
        buf.set_fault(std::io::Error::other("second"));
        assert_eq!(buf.fault().unwrap().to_string(), "first");
    }

    #[test]
    fn wait_for_append_wakes_early() {
        let buf = OutputBuffer::new();
        let writer = buf.clone();
        let seen = buf.generation();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.append("line\n");
        });

        let start = Instant::now();
        let generation = buf.wait_for_append(seen, Duration::from_secs(5));
        handle.join().unwrap();

        assert_eq!(generation, seen + 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn wait_for_append_times_out() {
        let buf = OutputBuffer::new();
        let start = Instant::now();
        let generation = buf.wait_for_append(0, Duration::from_millis(50));
        assert_eq!(generation, 0);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn readers_see_prefixes_of_final_content() {
        let buf = OutputBuffer::new();
        let writer = buf.clone();
        let lines: Vec<String> = (0..200).map(|i| format!("line {i}\n")).collect();
        let expected: String = lines.concat();

        let handle = thread::spawn(move || {
            for line in &lines {
                writer.append(line);
            }
        });

        let mut observed = Vec::new();
        while observed.len() < 50 {
            observed.push(buf.snapshot());
        }
        handle.join().unwrap();

        let last = buf.snapshot();
        assert_eq!(last, expected);
        for snap in observed {
            assert!(last.starts_with(&snap));
        }
    }
}
