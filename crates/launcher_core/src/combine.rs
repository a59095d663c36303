use futures::{
    stream::{BoxStream, SelectAll},
    FutureExt, StreamExt,
};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Fan-in of change signals from any number of watch channels.
///
/// A signal carries no value: consumers re-read the latest value of every
/// source on each wake, which gives combine-latest semantics regardless of
/// how updates interleave.
pub(crate) struct ChangeFeed {
    signals: SelectAll<BoxStream<'static, ()>>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        Self {
            signals: SelectAll::new(),
        }
    }

    pub(crate) fn watch<T>(mut self, receiver: watch::Receiver<T>) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.signals
            .push(WatchStream::from_changes(receiver).map(|_| ()).boxed());
        self
    }

    /// Waits for the next change, then swallows any that are already
    /// queued so a burst of writes costs one recompute. Returns `None` once
    /// every source has closed.
    pub(crate) async fn changed(&mut self) -> Option<()> {
        self.signals.next().await?;
        while let Some(Some(())) = self.signals.next().now_or_never() {}
        Some(())
    }
}

#[cfg(test)]
#[path = "tests/combine_tests.rs"]
mod tests;
