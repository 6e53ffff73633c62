//! Relays an incremental completion to a caller as server-sent event records
//!
//! The provider's fragments are pulled one at a time through [`FragmentSource`],
//! framed by [`framer::EventFramer`] and pushed into the response body by a
//! [`session::StreamSession`] running on its own task.
pub mod framer;
pub mod session;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::errors::ProxyResult;
use crate::providers::base::{CompletionRequest, Provider};

pub use framer::{EventFramer, FrameError, RecordDecoder};
pub use session::{spawn_relay, CloseReason, RelayHandle, SessionOutcome, SessionState};

/// Pull-based access to incremental output: the next fragment, or `None` at end-of-stream
#[async_trait]
pub trait FragmentSource: Send {
    async fn next_fragment(&mut self) -> ProxyResult<Option<String>>;
}

#[async_trait]
impl<S> FragmentSource for S
where
    S: Stream<Item = ProxyResult<String>> + Unpin + Send,
{
    async fn next_fragment(&mut self) -> ProxyResult<Option<String>> {
        self.next().await.transpose()
    }
}

/// Open an incremental completion and start relaying it.
///
/// A provider failure here is returned before any record exists, so the
/// caller can still answer with a plain error response.
pub async fn open_stream(
    provider: &dyn Provider,
    request: &CompletionRequest,
) -> ProxyResult<RelayHandle> {
    let fragments = provider.stream(request).await?;
    Ok(spawn_relay(fragments))
}
