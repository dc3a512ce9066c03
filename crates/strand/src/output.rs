//! Output sink for `print`-class built-ins and engine diagnostics.
//!
//! Every piece of script-visible output funnels through one [`OutputSink`]:
//! - Stdout: the default when no host subscribed
//! - Buffer: captured text, for tests and embedding
//! - Callback: a host hook (console or REPL attachment)

use std::sync::Arc;

use parking_lot::Mutex;

/// Host hook receiving each chunk of output. The flag marks diagnostics.
pub type OutputCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Sink that captures output to a buffer.
#[derive(Default)]
pub struct BufferSink {
    buffer: Mutex<String>,
}

impl BufferSink {
    /// Create an empty buffer sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text.
    pub fn write(&self, msg: &str) {
        self.buffer.lock().push_str(msg);
    }

    /// Everything captured so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Clear captured output.
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Destination of script output.
#[derive(Clone)]
pub enum OutputSink {
    /// Script output to stdout, diagnostics to stderr
    Stdout,
    /// Captured into a shared buffer
    Buffer(Arc<BufferSink>),
    /// Forwarded to a host callback
    Callback(OutputCallback),
}

impl Default for OutputSink {
    fn default() -> Self {
        OutputSink::Stdout
    }
}

impl OutputSink {
    /// A fresh buffer sink, plus the handle to read it back.
    pub fn buffer() -> (Self, Arc<BufferSink>) {
        let buffer = Arc::new(BufferSink::new());
        (OutputSink::Buffer(buffer.clone()), buffer)
    }

    /// Forward output to `callback`.
    pub fn callback(callback: impl Fn(&str, bool) + Send + Sync + 'static) -> Self {
        OutputSink::Callback(Arc::new(callback))
    }

    /// Append script output.
    pub fn write(&self, msg: &str) {
        match self {
            Self::Stdout => {
                use std::io::Write;
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(msg.as_bytes());
                let _ = out.flush();
            }
            Self::Buffer(b) => b.write(msg),
            Self::Callback(f) => f(msg, false),
        }
    }

    /// Append script output followed by a newline.
    pub fn write_line(&self, msg: &str) {
        self.write(&format!("{msg}\n"));
    }

    /// Report an engine diagnostic.
    pub fn diagnostic(&self, msg: &str) {
        match self {
            Self::Stdout => eprintln!("{msg}"),
            Self::Buffer(b) => b.write(&format!("{msg}\n")),
            Self::Callback(f) => f(msg, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_captures_lines_and_diagnostics() {
        let (sink, buffer) = OutputSink::buffer();
        sink.write("a");
        sink.write_line("b");
        sink.diagnostic("warn");
        assert_eq!(buffer.contents(), "ab\nwarn\n");
        buffer.clear();
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn test_callback_sees_diagnostic_flag() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let sink = OutputSink::callback(move |msg, diag| log.lock().push((msg.to_string(), diag)));
        sink.write("x");
        sink.diagnostic("y");
        assert_eq!(
            *seen.lock(),
            vec![("x".to_string(), false), ("y".to_string(), true)]
        );
    }
}
