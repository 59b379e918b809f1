//! Body fan-out: one primary cursor plus best-effort side cursors.
//!
//! The primary cursor drives the source, so the client's pace is the source's
//! pace. Side cursors get copies through bounded channels; a side that falls
//! behind is cut off instead of slowing the primary down.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::mpsc;

use super::BodyStream;

/// Chunks buffered per side cursor before it is cut off.
const SIDE_CAPACITY: usize = 256;

enum Tap {
    Chunk(Bytes),
    Done,
}

/// Independently consumable copy of an upstream body.
pub struct SideCursor {
    rx: mpsc::Receiver<Tap>,
}

/// Everything a side cursor saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideCapture {
    pub body: Bytes,
    /// False when the source failed, the primary stopped early, or this
    /// side fell behind.
    pub complete: bool,
}

impl SideCursor {
    /// Drain the cursor until the source ends.
    pub async fn read_to_end(mut self) -> SideCapture {
        let mut buf = BytesMut::new();
        while let Some(tap) = self.rx.recv().await {
            match tap {
                Tap::Chunk(chunk) => buf.extend_from_slice(&chunk),
                Tap::Done => return SideCapture { body: buf.freeze(), complete: true },
            }
        }
        SideCapture { body: buf.freeze(), complete: false }
    }
}

/// Split `body` into a primary stream and `sides` side cursors.
pub fn fan_out(mut body: BodyStream, sides: usize) -> (BodyStream, Vec<SideCursor>) {
    if sides == 0 {
        return (body, Vec::new());
    }

    let (mut senders, cursors): (Vec<_>, Vec<_>) = (0..sides)
        .map(|_| {
            let (tx, rx) = mpsc::channel(SIDE_CAPACITY);
            (tx, SideCursor { rx })
        })
        .unzip();

    let primary = async_stream::stream! {
        let mut failed = false;
        while let Some(item) = body.next().await {
            match &item {
                Ok(chunk) => senders.retain(|tx| match tx.try_send(Tap::Chunk(chunk.clone())) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!("[FanOut] Side cursor fell behind, detaching it");
                        false
                    },
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                }),
                Err(_) => failed = true,
            }
            yield item;
            if failed {
                break;
            }
        }
        if !failed {
            for tx in senders.drain(..) {
                tokio::spawn(async move {
                    let _ = tx.send(Tap::Done).await;
                });
            }
        }
    };

    (Box::pin(primary), cursors)
}
