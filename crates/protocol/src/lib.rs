pub mod constants;
pub mod queue;
pub mod view;

// Re-export primary types for convenience.
pub use queue::{QueueSession, QueueState, StateSnapshot};
pub use view::{OverlayView, format_elapsed};
