//! In-memory handlers for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that exercise the executor and workflow engine without
//! any real capability behind them.

mod echo;
mod failing;
mod follow_up;
mod recording;
mod sleepy;

pub use echo::EchoHandler;
pub use failing::{FailingHandler, PanickingHandler};
pub use follow_up::FollowUpHandler;
pub use recording::{RecordedCall, RecordingHandler};
pub use sleepy::SleepyHandler;
