//! Test doubles for the hardware, encoder, and display boundaries.
//!
//! Public so downstream crates can drive the controller without real
//! hardware. Each fake records the calls it receives and lets tests inject
//! failures and hardware callbacks.

mod fake_hal;
mod fake_recorder;
mod render_target;

pub use fake_hal::{FakeHal, FakeHalHandle, HalCall};
pub use fake_recorder::{FakeRecorderBackend, FakeRecorderHandle, RecorderCall};
pub use render_target::{NullRenderTarget, RenderTargetProbe};
