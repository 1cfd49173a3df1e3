use super::*;

/// A message pushed from the pool outside of any request/response exchange.
/// Fanned out over a `broadcast` channel so the connection loop never blocks
/// on the job-builder's lock (spec §4.7).
#[derive(Debug, Clone)]
pub enum Event {
    Notify(Notify),
    SetDifficulty(f64),
    Disconnected,
}
