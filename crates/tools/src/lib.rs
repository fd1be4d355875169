//! Tool runtime for investigation workers: the registry of available
//! tools, the executor that invokes them, and the observation funnel
//! that keeps oversized outputs out of the prompt.

pub mod builtin;
pub mod executor;
pub mod funnel;
pub mod registry;

pub use executor::ToolExecutor;
pub use funnel::LARGE_OUTPUT_MARKER;
pub use registry::{FnHandler, RegistryError, ToolDescriptor, ToolHandler, ToolRegistry};

/// The distinguished tool whose invocation completes an investigation.
pub const FINISH_TOOL: &str = "finish";
