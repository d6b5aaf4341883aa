//! Plugins shipped with the crate.

pub mod copy;

/// Names accepted by [`lookup`].
pub const BUILTIN_PLUGINS: &[&str] = &[copy::PLUGIN_NAME];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinPlugin {
    Copy,
}

impl BuiltinPlugin {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinPlugin::Copy => copy::PLUGIN_NAME,
        }
    }
}

pub fn lookup(name: &str) -> Option<BuiltinPlugin> {
    match name {
        copy::PLUGIN_NAME => Some(BuiltinPlugin::Copy),
        _ => None,
    }
}
