//! Per-read time limit for fragment streams

use super::FragmentStream;
use crate::error::MaiSaleError;
use futures::StreamExt;
use std::time::Duration;

/// Bound the wait for each next fragment.
///
/// When no fragment arrives within `limit` the stream yields a single
/// `MaiSaleError::Timeout` and ends.
pub fn with_read_timeout(stream: FragmentStream, limit: Duration) -> FragmentStream {
    let secs = limit.as_secs();
    Box::pin(futures::stream::unfold(
        Some(stream),
        move |state| async move {
            let mut stream = state?;
            match tokio::time::timeout(limit, stream.next()).await {
                Ok(Some(item)) => Some((item, Some(stream))),
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!("No fragment from the model within {:?}", limit);
                    Some((Err(MaiSaleError::Timeout(secs)), None))
                }
            }
        },
    ))
}
