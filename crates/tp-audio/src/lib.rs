//! Audio output backends for tidepool.

mod buffer;
mod cpal_backend;
mod traits;

pub use buffer::BufferOutput;
pub use cpal_backend::CpalOutput;
pub use traits::{AudioError, AudioOutput};
