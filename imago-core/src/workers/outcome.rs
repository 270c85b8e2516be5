//! Shared ack/nack decision returned by the thumbnail and cache workers
//! (§4.7, §4.8). The broker consumer loop (in the `worker` binary) turns
//! this into the actual `basic_ack`/`basic_nack` call; the decision itself
//! lives here so it can be unit-tested without a broker.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Nothing to do (idempotent short-circuit) or the write succeeded.
    Ack,
    /// The source image could not be decoded. Acked (never requeued) with
    /// a per-image failure recorded for the caller to surface.
    AckFailed { reason: String },
    /// Writing the rendition to disk failed. Caller should requeue, up to
    /// its configured maximum attempts, then dead-letter.
    NackRequeue { reason: String },
}
