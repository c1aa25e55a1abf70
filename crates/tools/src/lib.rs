//! The fixed VTT tool catalog (ToolExecutor, C5): schema definitions handed
//! to the provider gateway, and the dispatcher that drives each tool's
//! frontend round-trip through the pending-call registry.

pub mod executor;
pub mod schema;
pub mod sink;

pub use executor::ToolExecutor;
pub use schema::tool_definitions;
pub use sink::OutboundSink;
