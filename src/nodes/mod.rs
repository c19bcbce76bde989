//! A handful of small concrete node kinds, registered here for use in
//! tests and as a starting point for host applications. Each is a minimal,
//! single-purpose `NodeKind`, in the style of the teacher's own
//! `success_node.rs` / `failure_node.rs`.

mod constant;
mod failing;
mod passthrough;
mod probe;

pub use constant::Constant;
pub use failing::Failing;
pub use passthrough::Passthrough;
pub use probe::Probe;

use crate::registry::NodeRegistry;

/// Register every node kind in this module under its conventional tag.
/// Host applications that want these ready-made kinds available can call
/// this once at startup instead of registering each individually.
pub fn register_builtin(registry: &mut NodeRegistry) -> Result<(), crate::error::GraphError> {
    registry.register::<Constant<i64>>("constant_int")?;
    registry.register::<Constant<f64>>("constant_float")?;
    registry.register::<Passthrough<i64>>("passthrough_int")?;
    registry.register::<Probe<i64>>("probe_int")?;
    registry.register::<Failing>("failing")?;
    Ok(())
}
