//! Inbound read loop: transport frames in, hub messages out.

use haptic_proto::decode_frame;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::hub::Hub;
use crate::transport::FrameSource;

/// Start the read loop against the transport's read half.
///
/// Each decoded message is published to the hub in within-frame order.
/// Malformed frames are logged and skipped; a transport error ends the loop
/// and cancels `session_ended`, the one-shot signal every blocking waiter
/// observes. Cancelling `session_ended` from outside also stops the loop.
/// The reader never stops the hub itself; that ordering belongs to the
/// session teardown.
pub fn spawn_reader(
    mut source: impl FrameSource,
    hub: Hub,
    session_ended: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = session_ended.cancelled() => break,
                frame = source.next_frame() => match frame {
                    Ok(text) => match decode_frame(&text) {
                        Ok(messages) => {
                            for message in messages {
                                hub.publish(message);
                            }
                        }
                        Err(error) => {
                            tracing::warn!(%error, "skipping undecodable frame");
                        }
                    },
                    Err(TransportError::Closed) => {
                        tracing::debug!("connection closed, read loop ending");
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "transport failure, read loop ending");
                        break;
                    }
                },
            }
        }
        // Idempotent: signals session termination exactly once overall.
        session_ended.cancel();
    })
}
