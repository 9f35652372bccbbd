use std::collections::HashMap;

use super::category::{Category, CategoryEntry, CategoryError, CategoryId};

/// The flattened taxonomy, in the order choices are offered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<CategoryEntry>,
}

impl Catalog {
    pub fn from_tree(root: &Category) -> Self {
        Catalog {
            entries: root.flatten().collect(),
        }
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &CategoryId) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// 1-based selection, as shown in numbered prompts.
    pub fn select(&self, number: usize) -> Result<&CategoryEntry, CategoryError> {
        number
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .ok_or_else(|| CategoryError::InvalidSelection(number.to_string()))
    }

    /// Most-used categories first; equal counts fall back to description order.
    pub fn rank_by_usage(&self, usage: &HashMap<CategoryId, u64>) -> Catalog {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            let ua = usage.get(&a.id).copied().unwrap_or(0);
            let ub = usage.get(&b.id).copied().unwrap_or(0);
            ub.cmp(&ua).then_with(|| a.description.cmp(&b.description))
        });
        Catalog { entries }
    }
}
