//! Outbound frame sinks and an in-memory channel.

use crate::error::{Result, TransferError};
use crate::protocol::ChannelFrame;
use futures::SinkExt;
use futures::channel::mpsc as fmpsc;
use std::future::Future;
use tokio::sync::mpsc;

/// Outbound half of a reliable, ordered peer channel.
///
/// `send_frame` resolves once the frame has been accepted; a bounded
/// implementation applies backpressure by not resolving until there is room.
pub trait FrameSink {
    /// Queue one frame.
    fn send_frame(&mut self, frame: ChannelFrame) -> impl Future<Output = Result<()>> + Send;
}

impl FrameSink for mpsc::Sender<ChannelFrame> {
    async fn send_frame(&mut self, frame: ChannelFrame) -> Result<()> {
        self.send(frame).await.map_err(|_| TransferError::ChannelClosed)
    }
}

impl FrameSink for fmpsc::Sender<ChannelFrame> {
    async fn send_frame(&mut self, frame: ChannelFrame) -> Result<()> {
        SinkExt::send(self, frame)
            .await
            .map_err(|_| TransferError::ChannelClosed)
    }
}

/// Create a bounded in-memory channel standing in for a peer data channel.
///
/// The receiving half is a `Stream` of frames suitable for
/// [`crate::TransferReceiver::receive`].
pub fn memory_channel(
    capacity: usize,
) -> (fmpsc::Sender<ChannelFrame>, fmpsc::Receiver<ChannelFrame>) {
    fmpsc::channel(capacity)
}
