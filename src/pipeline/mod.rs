//! Runtime plumbing: the blocking queues and the thread topology that
//! connects capture, decode, and persistence.

mod queue;
mod runtime;

pub use queue::Queue;
pub use runtime::{Pipeline, Status};
