use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use super::framer::EventFramer;
use super::FragmentSource;

/// Records buffered between the pump task and the response body
pub const RELAY_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The provider signalled end-of-stream
    Exhausted,
    /// The provider failed after the first record may already have been sent
    UpstreamError,
    /// The caller went away
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing(CloseReason),
    Closed(CloseReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub reason: CloseReason,
    /// Number of records written to the caller
    pub records: usize,
    /// Every fragment written, concatenated in order
    pub transcript: String,
}

/// One outbound event stream: `Open -> (emit)* -> Closing -> Closed`
pub struct StreamSession<S> {
    source: S,
    tx: mpsc::Sender<Bytes>,
    state: SessionState,
    records: usize,
    transcript: String,
}

impl<S: FragmentSource> StreamSession<S> {
    pub fn new(source: S, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            source,
            tx,
            state: SessionState::Open,
            records: 0,
            transcript: String::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Leave `Open`. Only the first cause is kept; returns false if the
    /// session was already closing or closed.
    pub fn begin_close(&mut self, reason: CloseReason) -> bool {
        match self.state {
            SessionState::Open => {
                self.state = SessionState::Closing(reason);
                true
            }
            _ => false,
        }
    }

    /// Move to `Closed`. Returns true exactly once per session.
    pub fn finish(&mut self) -> bool {
        match self.state {
            SessionState::Open => false,
            SessionState::Closing(reason) => {
                self.state = SessionState::Closed(reason);
                true
            }
            SessionState::Closed(_) => false,
        }
    }

    /// Write one record. Returns false, and starts closing, if the caller is gone.
    async fn emit(&mut self, fragment: String) -> bool {
        if self.state != SessionState::Open {
            return false;
        }
        if self.tx.send(EventFramer::frame(&fragment)).await.is_err() {
            self.begin_close(CloseReason::Disconnected);
            return false;
        }
        self.records += 1;
        self.transcript.push_str(&fragment);
        true
    }

    /// Pump fragments until the source ends, fails, or the caller disconnects
    pub async fn run(mut self) -> SessionOutcome {
        while self.state == SessionState::Open {
            let next = tokio::select! {
                biased;
                _ = self.tx.closed() => {
                    self.begin_close(CloseReason::Disconnected);
                    break;
                }
                next = self.source.next_fragment() => next,
            };

            match next {
                Ok(Some(fragment)) => {
                    self.emit(fragment).await;
                }
                Ok(None) => {
                    self.begin_close(CloseReason::Exhausted);
                }
                Err(err) => {
                    error!("Upstream failed mid-stream: {}", err);
                    self.begin_close(CloseReason::UpstreamError);
                }
            }
        }

        self.close()
    }

    /// Finalize the channel. Dropping the source releases the upstream request
    /// and dropping the sender ends the response body.
    fn close(mut self) -> SessionOutcome {
        self.finish();
        let reason = match self.state {
            SessionState::Closed(reason) | SessionState::Closing(reason) => reason,
            SessionState::Open => CloseReason::Exhausted,
        };
        debug!(
            "Stream session closed ({:?}) after {} records",
            reason, self.records
        );

        SessionOutcome {
            reason,
            records: self.records,
            transcript: self.transcript,
        }
    }
}

/// The caller-facing half of a running relay
pub struct RelayHandle {
    /// Framed records, ready to be used as a response body
    pub body: ReceiverStream<Bytes>,
    /// Resolves when the session has closed
    pub outcome: JoinHandle<SessionOutcome>,
}

/// Start pumping `source` into a fresh channel on its own task
pub fn spawn_relay<S>(source: S) -> RelayHandle
where
    S: FragmentSource + 'static,
{
    let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    let session = StreamSession::new(source, tx);
    let outcome = tokio::spawn(session.run());

    RelayHandle {
        body: ReceiverStream::new(rx),
        outcome,
    }
}
