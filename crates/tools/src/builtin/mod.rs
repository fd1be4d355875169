//! Built-in diagnostic tools, registered in code before directory
//! discovery runs.

pub mod finish;
pub mod read_file;
pub mod search;
pub mod shell;

use crate::registry::{RegistryError, ToolRegistry};

/// Register the built-in tool set: `shell`, `read_file`, `search_files`,
/// and the distinguished `finish` tool.
pub fn register_builtins(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(shell::descriptor())?;
    registry.register(read_file::descriptor())?;
    registry.register(search::descriptor())?;
    registry.register(finish::descriptor())?;
    Ok(())
}
