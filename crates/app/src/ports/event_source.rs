//! Event source port — pub/sub endpoint delivering device telemetry.

use std::future::Future;

use greenhouse_domain::error::{SourceError, TransportError};
use greenhouse_domain::event::Event;

/// One received event together with the token that settles it.
#[derive(Debug)]
pub struct Delivery<T> {
    pub event: Event,
    pub token: T,
}

/// A subscription yielding telemetry events with explicit settlement.
///
/// Every successful [`receive`](Self::receive) must be followed by exactly
/// one [`ack`](Self::ack) or [`reject`](Self::reject) before the next receive.
pub trait EventSource: Send {
    /// Handle identifying one delivery for settlement.
    type Token: Send + 'static;

    /// Wait, without timeout, for the next event.
    ///
    /// Returns [`SourceError::Transport`] once the stream can no longer
    /// deliver anything; [`SourceError::Decode`] for a single undecodable
    /// delivery which the source has already settled.
    fn receive(
        &mut self,
    ) -> impl Future<Output = Result<Delivery<Self::Token>, SourceError>> + Send;

    /// Acknowledge a processed delivery.
    fn ack(&mut self, token: Self::Token) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reject a delivery that could not be processed.
    fn reject(
        &mut self,
        token: Self::Token,
        reason: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Release the subscription.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
