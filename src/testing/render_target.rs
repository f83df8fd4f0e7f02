//! Render target double.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::surfaces::RenderTarget;
use crate::types::Size;

/// Observes what the surface set did to a [`NullRenderTarget`] after the
/// target itself has been boxed away.
#[derive(Clone)]
pub struct RenderTargetProbe {
    released: Arc<AtomicBool>,
    buffer_size: Arc<Mutex<Option<Size>>>,
}

impl RenderTargetProbe {
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn buffer_size(&self) -> Option<Size> {
        *self.buffer_size.lock().unwrap()
    }
}

/// A display surface that renders nowhere.
pub struct NullRenderTarget {
    id: i64,
    released: Arc<AtomicBool>,
    buffer_size: Arc<Mutex<Option<Size>>>,
}

impl NullRenderTarget {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            released: Arc::new(AtomicBool::new(false)),
            buffer_size: Arc::new(Mutex::new(None)),
        }
    }

    /// Same target plus a probe for asserting on it later.
    pub fn probed(id: i64) -> (Self, RenderTargetProbe) {
        let target = Self::new(id);
        let probe = RenderTargetProbe {
            released: target.released.clone(),
            buffer_size: target.buffer_size.clone(),
        };
        (target, probe)
    }
}

impl RenderTarget for NullRenderTarget {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_buffer_size(&mut self, size: Size) {
        *self.buffer_size.lock().unwrap() = Some(size);
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
