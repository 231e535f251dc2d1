pub mod diff;
pub mod normalize;
pub mod pipeline;
pub mod projector;

#[cfg(test)]
mod testing;

pub use diff::diff;
pub use normalize::normalize;
pub use pipeline::{SyncEngine, SyncReport};
pub use projector::{is_color_mismatch, Projector};
