//! Request handlers.

pub mod health;
pub mod playback;
pub mod upload;

pub use health::*;
pub use playback::*;
pub use upload::*;
