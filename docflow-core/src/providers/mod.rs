pub mod chatflow;
pub mod workflow;
