//! The decode → classify → accumulate loop for one stream.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use ts_protocol::{AccumulatedMessage, Chunk, ResponseMode, StreamOutcome};

use crate::accumulate::{ResponseAccumulator, Step, UpdateSink};
use crate::classify::Classifier;
use crate::collab::FlowRunner;
use crate::error::{StreamError, StreamFailure, GENERIC_REMOTE_ERROR};

/// Drive `values` to a terminal outcome.
///
/// Cancellation is checked before every value; a cancelled stream returns
/// `Ok` with an [`StreamOutcome::Interrupted`] message. Fatal errors return
/// [`StreamFailure`] carrying the partial message. Either way the sink sees
/// exactly one update with `complete == true`.
pub async fn run_pipeline<V, S>(
    values: V,
    mode: ResponseMode,
    flows: &dyn FlowRunner,
    cancel: &CancellationToken,
    sink: S,
) -> Result<AccumulatedMessage, StreamFailure>
where
    V: Stream<Item = Result<Value, StreamError>>,
    S: UpdateSink,
{
    let classifier = Classifier::new(mode);
    let mut acc = ResponseAccumulator::new(sink);
    tokio::pin!(values);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("stream interrupted");
                return Ok(acc.finish(StreamOutcome::Interrupted));
            }
            next = values.next() => next,
        };

        let value = match next {
            // Exhaustion without `end` is a natural finish: the standard
            // endpoint never sends one.
            None => return Ok(acc.finish(StreamOutcome::Completed)),
            Some(Err(error)) => return Err(fail(acc, error)),
            Some(Ok(value)) => value,
        };

        let Some(chunk) = classifier.classify(value) else {
            continue;
        };

        match chunk {
            Chunk::StructuredPayload(payload) => {
                if !flows.try_run(&payload) {
                    tracing::warn!("dropping structured payload that is not a valid flow");
                }
            }
            Chunk::Unrecognized(kind) => {
                tracing::debug!(kind, "ignoring unrecognized chunk");
            }
            Chunk::Error(detail) => {
                let detail = detail.unwrap_or_else(|| GENERIC_REMOTE_ERROR.to_string());
                return Err(fail(acc, StreamError::Remote(detail)));
            }
            chunk => {
                if acc.apply(chunk) == Step::End {
                    return Ok(acc.finish(StreamOutcome::Completed));
                }
            }
        }
    }
}

fn fail<S: UpdateSink>(acc: ResponseAccumulator<S>, error: StreamError) -> StreamFailure {
    tracing::debug!(%error, "stream failed");
    StreamFailure {
        error,
        partial: acc.finish(StreamOutcome::Failed),
    }
}
