use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        CategoryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Category id appears more than once: {0}")]
    DuplicateId(CategoryId),
    #[error("Invalid category choice: {0}")]
    InvalidSelection(String),
    #[error("Invalid category definitions: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A node of the category taxonomy as loaded from `categories.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub description: String,
    #[serde(default)]
    pub children: Vec<Category>,
    #[serde(default)]
    pub hidden: bool,
}

/// A flattened `{id, description}` pair used for lookups and numbered choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: CategoryId,
    pub description: String,
}

impl Category {
    pub fn new(id: &str, description: &str) -> Self {
        Category {
            id: CategoryId::new(id),
            description: description.to_string(),
            children: Vec::new(),
            hidden: false,
        }
    }

    pub fn with_children(mut self, children: Vec<Category>) -> Self {
        self.children = children;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn entry(&self) -> CategoryEntry {
        CategoryEntry {
            id: self.id.clone(),
            description: self.description.clone(),
        }
    }

    /// Post-order walk: every descendant is yielded before its ancestor.
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            stack: vec![(self, 0)],
        }
    }

    /// Depth-first search for the subtree rooted at `id`.
    pub fn find(&self, id: &CategoryId) -> Option<&Category> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// All ids in this subtree, in flatten order.
    pub fn ids(&self) -> Vec<CategoryId> {
        self.flatten().map(|entry| entry.id).collect()
    }

    /// Ids of the nodes a report shows: a hidden node and everything under
    /// it are left out. Post-order, like `flatten`.
    pub fn visible_ids(&self) -> Vec<CategoryId> {
        let mut ids = Vec::new();
        self.collect_visible(&mut ids);
        ids
    }

    fn collect_visible(&self, ids: &mut Vec<CategoryId>) {
        if self.hidden {
            return;
        }
        for child in &self.children {
            child.collect_visible(ids);
        }
        ids.push(self.id.clone());
    }

    /// Parses a definitions file and rejects duplicate ids.
    pub fn from_json(json: &str) -> Result<Category, CategoryError> {
        let root: Category = serde_json::from_str(json)?;
        root.validate()?;
        Ok(root)
    }

    pub fn load(path: &Path) -> Result<Category, CategoryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), CategoryError> {
        let mut seen = HashSet::new();
        for entry in self.flatten() {
            if !seen.insert(entry.id.clone()) {
                return Err(CategoryError::DuplicateId(entry.id));
            }
        }
        Ok(())
    }
}

/// Lazy post-order iterator over a category tree.
///
/// Each stack frame holds a node and the index of the next child to descend
/// into; a node is emitted once all of its children have been visited.
pub struct Flatten<'a> {
    stack: Vec<(&'a Category, usize)>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = CategoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let node: &'a Category = frame.0;
            if let Some(child) = node.children.get(frame.1) {
                frame.1 += 1;
                self.stack.push((child, 0));
            } else {
                self.stack.pop();
                return Some(node.entry());
            }
        }
    }
}
