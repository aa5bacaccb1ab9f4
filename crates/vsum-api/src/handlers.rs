//! Request handlers.

pub mod health;
pub mod jobs;
pub mod summary;
pub mod transcript;

pub use health::*;
pub use jobs::*;
pub use summary::*;
pub use transcript::*;
