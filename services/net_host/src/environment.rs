//! Process environment mutation

use relay_core::EnvironmentMutator;
use std::collections::HashMap;
use tracing::debug;

/// Writes variables into this process's environment, inherited by anything it starts
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentMutator for ProcessEnvironment {
    fn apply(&self, variables: &HashMap<String, String>) {
        for (key, value) in variables {
            std::env::set_var(key, value);
        }
        debug!(count = variables.len(), "Environment variables applied");
    }
}
