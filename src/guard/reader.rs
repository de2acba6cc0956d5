// src/guard/reader.rs

//! Output readers.
//!
//! One reader per redirected stream. Each consumes raw lines until end of
//! stream and, for every line:
//! 1. writes it to the shared [`LogSink`],
//! 2. hands it to [`GuardHooks::on_output_line`],
//! 3. while the run is still `Starting`, classifies it against the keyword
//!    sets (started keywords first).
//!
//! When the stream ends the state becomes `Stopped` no matter what it was
//! before; this is how an unexpected exit is noticed.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::guard::hooks::GuardHooks;
use crate::guard::log_sink::LogSink;
use crate::guard::spec::{KeywordSet, LineVerdict};
use crate::guard::state::StateCell;
use crate::types::{GuardState, OutputEncoding, OutputStream};

#[derive(Clone)]
pub struct OutputReader {
    pub guard: Arc<str>,
    pub stream: OutputStream,
    pub encoding: OutputEncoding,
    pub keywords: Arc<KeywordSet>,
    pub state: StateCell,
    pub log: LogSink,
    pub hooks: Arc<dyn GuardHooks>,
}

impl OutputReader {
    /// Fire-and-forget: run the reader on its own Tokio task.
    pub fn spawn<R>(self, source: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let span = info_span!("guard", name = %self.guard, stream = %self.stream);
        tokio::spawn(self.run(source).instrument(span))
    }

    pub async fn run<R>(self, source: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = self.encoding.decode_line(&buf);
                    self.handle_line(&line);
                }
                Err(e) => {
                    // Treated like end of stream.
                    debug!(guard = %self.guard, stream = %self.stream, error = %e, "read error");
                    break;
                }
            }
        }

        let previous = self.state.force(GuardState::Stopped);
        debug!(
            guard = %self.guard,
            stream = %self.stream,
            previous = %previous,
            "output stream ended"
        );
    }

    fn handle_line(&self, line: &str) {
        trace!(guard = %self.guard, stream = %self.stream, "{}", line);

        self.log.write_line(line);
        self.hooks.on_output_line(&self.guard, self.stream, line);

        if self.state.current() != GuardState::Starting {
            return;
        }

        match self.keywords.classify(line) {
            Some(LineVerdict::Started(keyword)) => {
                if self.state.leave_starting(GuardState::Started) {
                    info!(guard = %self.guard, keyword, "started keyword seen");
                }
            }
            Some(LineVerdict::Failed(keyword)) => {
                if self.state.leave_starting(GuardState::Stopped) {
                    warn!(guard = %self.guard, keyword, line, "failure keyword seen during startup");
                }
            }
            None => {}
        }
    }
}
