//! Surface set: the external render target plus the two hardware
//! frame-consumer endpoints (single-shot still and continuous stream).
//!
//! Consumer queues are bounded at depth 2 with drop-oldest overflow, the
//! same discipline the hardware pool uses: a slow consumer never blocks the
//! producer, it just loses the stalest buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::hal::RawImage;
use crate::types::{PixelFormat, Size};

/// Queue depth for both consumers.
const CONSUMER_DEPTH: usize = 2;

/// The external display surface the preview renders into. Shared with the
/// display system; this crate only sizes its buffers and releases it on
/// dispose.
pub trait RenderTarget: Send {
    /// Identifier the external display system knows this surface by.
    fn id(&self) -> i64;

    /// Resize the backing buffer to the preview size.
    fn set_buffer_size(&mut self, size: Size);

    /// Release the binding. Further use is invalid.
    fn release(&mut self);
}

struct ConsumerInner {
    images: VecDeque<RawImage>,
    closed: bool,
    dropped: u64,
}

/// Producer half of a consumer queue, handed to the hardware layer when a
/// session binds the surface.
#[derive(Clone)]
pub struct FrameProducer {
    inner: Arc<Mutex<ConsumerInner>>,
}

impl FrameProducer {
    /// Enqueue a completed buffer, evicting the oldest if the queue is full.
    /// Pushing into a closed queue is a silent no-op.
    pub fn push(&self, image: RawImage) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.closed {
            return;
        }
        if inner.images.len() >= CONSUMER_DEPTH {
            inner.images.pop_front();
            inner.dropped = inner.dropped.saturating_add(1);
        }
        inner.images.push_back(image);
    }
}

/// A bounded frame-consumer queue fed by the hardware layer.
pub struct FrameConsumer {
    inner: Arc<Mutex<ConsumerInner>>,
    size: Size,
    format: PixelFormat,
}

impl FrameConsumer {
    pub fn new(size: Size, format: PixelFormat) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConsumerInner {
                images: VecDeque::with_capacity(CONSUMER_DEPTH),
                closed: false,
                dropped: 0,
            })),
            size,
            format,
        }
    }

    pub fn producer(&self) -> FrameProducer {
        FrameProducer {
            inner: self.inner.clone(),
        }
    }

    /// Drain the queue and return only the newest buffer, discarding any
    /// staler ones. `None` when nothing is queued, which is a legitimate
    /// empty callback rather than an error.
    pub fn acquire_latest(&self) -> Option<RawImage> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let latest = inner.images.pop_back();
        if latest.is_some() {
            let skipped = inner.images.len() as u64;
            inner.dropped = inner.dropped.saturating_add(skipped);
            inner.images.clear();
        }
        latest
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn dropped(&self) -> u64 {
        self.inner.lock().expect("lock poisoned").dropped
    }

    /// Close the queue and drop any queued buffers. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.closed = true;
        inner.images.clear();
    }
}

/// Owns the render target and the optional still/stream consumers.
pub struct SurfaceSet {
    render_target: Box<dyn RenderTarget>,
    still: Option<FrameConsumer>,
    stream: Option<FrameConsumer>,
}

impl SurfaceSet {
    pub fn new(render_target: Box<dyn RenderTarget>) -> Self {
        Self {
            render_target,
            still: None,
            stream: None,
        }
    }

    pub fn texture_id(&self) -> i64 {
        self.render_target.id()
    }

    /// Size the render target's buffers for the preview stream.
    pub fn bind_preview_surface(&mut self, preview_size: Size) {
        self.render_target.set_buffer_size(preview_size);
    }

    /// (Re)allocate the still-image consumer. Any previous consumer of this
    /// kind is closed and replaced. Callers detach listeners before calling.
    pub fn prepare_still_consumer(&mut self, capture_size: Size) {
        if let Some(old) = self.still.take() {
            old.close();
        }
        self.still = Some(FrameConsumer::new(capture_size, PixelFormat::Jpeg));
    }

    /// (Re)allocate the raw-stream consumer. Same replacement rules as the
    /// still consumer.
    pub fn prepare_stream_consumer(&mut self, preview_size: Size) {
        if let Some(old) = self.stream.take() {
            old.close();
        }
        self.stream = Some(FrameConsumer::new(preview_size, PixelFormat::Yuv420));
    }

    pub fn still(&self) -> Option<&FrameConsumer> {
        self.still.as_ref()
    }

    pub fn stream(&self) -> Option<&FrameConsumer> {
        self.stream.as_ref()
    }

    /// Close both consumers. Idempotent, safe when never initialized.
    pub fn release_all(&mut self) {
        if let Some(still) = self.still.take() {
            still.close();
        }
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
    }

    /// Release the render-target binding itself (dispose path).
    pub fn release_render_target(&mut self) {
        self.render_target.release();
    }
}
