//! Committed value snapshots for rendering and persistence collaborators

use cellflow_core::CellValue;
use cellflow_formula::CellKey;
use std::collections::BTreeMap;

/// Owned copy of every non-empty cell value, taken between passes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSnapshot {
    values: BTreeMap<CellKey, CellValue>,
}

impl ValueSnapshot {
    pub(crate) fn from_values(values: impl IntoIterator<Item = (CellKey, CellValue)>) -> Self {
        Self {
            values: values.into_iter().filter(|(_, v)| !v.is_empty()).collect(),
        }
    }

    /// Value at `key`; cells absent from the snapshot are empty
    pub fn get(&self, key: CellKey) -> CellValue {
        self.values.get(&key).cloned().unwrap_or_default()
    }

    /// Non-empty cells in key order
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &CellValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
