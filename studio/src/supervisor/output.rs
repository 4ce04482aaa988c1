//! Capped output accumulation for supervised processes

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Appended once when a process produced more than the configured limit
pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

#[derive(Default)]
struct BufferState {
    text: String,
    truncated: bool,
}

/// Shared stdout+stderr buffer of one process
///
/// Cloning shares the same buffer, so the process table can serve live
/// output while the readers keep appending.
#[derive(Clone)]
pub struct OutputBuffer {
    state: Arc<Mutex<BufferState>>,
    limit: usize,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BufferState::default())),
            limit,
        }
    }

    /// Append one line, cutting it on a UTF-8 boundary at the limit
    ///
    /// The line terminator counts toward the limit. A line that fills the
    /// remaining room exactly is kept whole without its terminator; the
    /// buffer is only marked truncated once more output arrives.
    pub async fn push_line(&self, line: &str) {
        let mut state = self.state.lock().await;
        if state.truncated {
            return;
        }

        let room = self.limit.saturating_sub(state.text.len());
        if room > 0 && line.len() <= room {
            state.text.push_str(line);
            if line.len() < room {
                state.text.push('\n');
            }
            return;
        }

        let mut cut = room.min(line.len());
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        state.text.push_str(&line[..cut]);
        state.text.push_str(TRUNCATION_MARKER);
        state.truncated = true;
    }

    pub async fn snapshot(&self) -> String {
        self.state.lock().await.text.clone()
    }
}

/// Copy a child pipe into `buffer` line by line until EOF
///
/// Invalid UTF-8 is replaced rather than ending the stream.
pub fn spawn_reader<R>(reader: R, buffer: OutputBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(reader).split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    buffer.push_line(line.trim_end_matches('\r')).await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Output reader stopped: {}", e);
                    break;
                }
            }
        }
    })
}
