//! Plugin Collaborators
//!
//! The catalog never manages plugin processes. It only needs three things
//! from a loaded plugin: its version, its configuration policy tree, and a
//! stable identity used when the plugin unloads.
//!
//! - [`LoadedPlugin`]: a plugin record handed over by the plugin manager
//! - [`PluginRef`]: the non-owning back-reference stored on metric entries
//! - [`ConfigPolicyTree`]: per-namespace configuration rules

mod policy;
mod types;

pub use policy::{ConfigDataNode, ConfigPolicyNode, ConfigPolicyTree, ConfigValue, PolicyRule};
pub use types::{LoadedPlugin, PluginRef, PluginType};
