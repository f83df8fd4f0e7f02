//! Frame dispatcher.
//!
//! Pulls completed buffers off the consumer queues and converts them into
//! detached records. Buffers are acquired, copied, and released within one
//! call; nothing here holds hardware memory past its scope.

use crate::surfaces::FrameConsumer;
use crate::types::{Frame, FramePlane};

/// Single-shot still drain: newest buffer's first plane, copied out. The
/// buffer is released before the bytes go anywhere near a file.
pub fn drain_still(consumer: &FrameConsumer) -> Option<Vec<u8>> {
    let image = consumer.acquire_latest()?;
    let bytes = image.planes.first().map(|plane| plane.bytes.to_vec());
    drop(image);
    bytes
}

/// Continuous stream drain: newest buffer with every plane's stride and
/// bytes copied into a detached [`Frame`]. `None` means the availability
/// callback raced an earlier drain, which is fine.
pub fn drain_stream(consumer: &FrameConsumer) -> Option<Frame> {
    let image = consumer.acquire_latest()?;
    let planes = image
        .planes
        .iter()
        .map(|plane| FramePlane {
            bytes_per_row: plane.row_stride,
            bytes_per_pixel: plane.pixel_stride,
            bytes: plane.bytes.to_vec(),
        })
        .collect();

    Some(Frame {
        width: image.width,
        height: image.height,
        format: image.format,
        planes,
    })
}
