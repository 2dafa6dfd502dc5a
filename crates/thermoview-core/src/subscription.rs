//! Cancellable streams of decoded notifications.
//!
//! A [`Subscription`] turns the raw payload stream of one characteristic
//! into a stream of decoded values. Payloads the decoder rejects are skipped.
//! Cancelling the subscription (explicitly, through a cloned token, or by
//! dropping it) ends the stream at the next poll.

use std::future::ready;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use thermoview_types::payload::parse_scalar_payload;
use thermoview_types::uuid::{AVERAGE_TEMPERATURE, MAX_TEMPERATURE, RAW_GRID};
use thermoview_types::{ParseResult, ThermalGrid, ThermalUpdate};

use crate::traits::NotificationStream;

/// Decode a payload from one of the three data characteristics.
///
/// Returns `None` for characteristics that carry no thermal data.
pub fn decode_update(characteristic: &Uuid, payload: &[u8]) -> Option<ParseResult<ThermalUpdate>> {
    match *characteristic {
        RAW_GRID => Some(ThermalGrid::from_payload(payload).map(ThermalUpdate::Grid)),
        AVERAGE_TEMPERATURE => Some(Ok(ThermalUpdate::Average(parse_scalar_payload(payload)))),
        MAX_TEMPERATURE => Some(Ok(ThermalUpdate::Maximum(parse_scalar_payload(payload)))),
        _ => None,
    }
}

/// A stream of decoded values from one characteristic.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use thermoview_core::Subscription;
///
/// let mut grids = Subscription::new(RAW_GRID, notifications, |p| ThermalGrid::from_payload(p).ok());
/// let token = grids.cancellation_token();
/// while let Some(grid) = grids.next().await {
///     println!("{grid}");
/// }
/// ```
pub struct Subscription<T> {
    characteristic: Uuid,
    stream: Pin<Box<dyn Stream<Item = T> + Send>>,
    cancel_token: CancellationToken,
}

impl<T: Send + 'static> Subscription<T> {
    /// Wrap `notifications`, decoding each payload with `decoder`.
    pub fn new<F>(characteristic: Uuid, notifications: NotificationStream, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<T> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let stream = notifications
            .filter_map(move |payload| ready(decoder(&payload)))
            .take_until(cancel_token.clone().cancelled_owned())
            .boxed();

        Self {
            characteristic,
            stream,
            cancel_token,
        }
    }
}

impl Subscription<ThermalUpdate> {
    /// Subscription decoding with [`decode_update`], logging rejected payloads.
    pub fn thermal(characteristic: Uuid, notifications: NotificationStream) -> Self {
        Self::new(characteristic, notifications, move |payload| {
            match decode_update(&characteristic, payload)? {
                Ok(update) => Some(update),
                Err(e) => {
                    debug!("Discarding payload from {}: {}", characteristic, e);
                    None
                }
            }
        })
    }
}

impl<T> Subscription<T> {
    /// The characteristic this subscription reads.
    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    /// Stop the stream. Pending and future payloads are dropped.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Get a cancellation token that can be used to cancel the stream externally.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Check if the stream has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("characteristic", &self.characteristic)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.stream.as_mut().poll_next(cx)
    }
}
