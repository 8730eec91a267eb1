use crate::virtual_machine::errors::VMError;
use std::collections::HashMap;

/// Global variable store. Entries are created by `STORE` and never removed.
#[derive(Debug, Default)]
pub(super) struct Variables(HashMap<String, i64>);

impl Variables {
    pub(super) fn new() -> Self {
        Self(HashMap::new())
    }

    pub(super) fn get(&self, name: &str) -> Result<i64, VMError> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| VMError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    pub(super) fn set(&mut self, name: &str, value: i64) {
        match self.0.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.0.insert(name.to_string(), value);
            }
        }
    }

    /// All bindings sorted by name.
    pub(super) fn sorted(&self) -> Vec<(&str, i64)> {
        let mut out: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        out.sort_unstable_by(|a, b| a.0.cmp(b.0));
        out
    }
}
