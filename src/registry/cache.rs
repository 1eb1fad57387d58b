//! Prefixed tool cache
//!
//! Tools are stored as one slice per backend plus a name index. The cache
//! itself is plain data; the registry serializes access to it.
use crate::registry::types::PrefixedTool;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Cached, prefixed tools for every backend
#[derive(Debug, Default)]
pub struct ToolCache {
    slices: HashMap<String, Vec<PrefixedTool>>,
    /// prefixed name -> (backend name, position in that backend's slice)
    index: HashMap<String, (String, usize)>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a backend's slice in one step.
    ///
    /// A backend listing the same tool twice keeps the first position and
    /// the last definition.
    pub fn replace_backend(&mut self, backend: &str, tools: Vec<PrefixedTool>) -> usize {
        self.remove_backend(backend);

        let mut slice: Vec<PrefixedTool> = Vec::with_capacity(tools.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for tool in tools {
            match positions.get(&tool.prefixed_name) {
                Some(&pos) => slice[pos] = tool,
                None => {
                    positions.insert(tool.prefixed_name.clone(), slice.len());
                    slice.push(tool);
                }
            }
        }

        for (name, pos) in positions {
            if let Some((other, _)) = self.index.get(&name) {
                warn!(
                    tool = %name,
                    backend = %backend,
                    shadowed = %other,
                    "Prefixed tool name collides with another backend"
                );
            }
            self.index.insert(name, (backend.to_string(), pos));
        }

        let count = slice.len();
        self.slices.insert(backend.to_string(), slice);
        count
    }

    /// Drop every tool of a backend; returns how many were removed.
    pub fn remove_backend(&mut self, backend: &str) -> usize {
        let Some(slice) = self.slices.remove(backend) else {
            return 0;
        };

        for tool in &slice {
            let owned_here = self
                .index
                .get(&tool.prefixed_name)
                .is_some_and(|(owner, _)| owner == backend);
            if owned_here {
                self.index.remove(&tool.prefixed_name);
                self.reindex_shadowed(&tool.prefixed_name);
            }
        }

        debug!("Removed {} tools from {}", slice.len(), backend);
        slice.len()
    }

    /// Point a freed name at another backend still listing it.
    fn reindex_shadowed(&mut self, prefixed_name: &str) {
        let survivor = self.slices.iter().find_map(|(owner, slice)| {
            slice
                .iter()
                .position(|t| t.prefixed_name == prefixed_name)
                .map(|pos| (owner.clone(), pos))
        });
        if let Some((owner, pos)) = survivor {
            debug!(tool = %prefixed_name, backend = %owner, "Restored shadowed tool");
            self.index.insert(prefixed_name.to_string(), (owner, pos));
        }
    }

    pub fn get(&self, prefixed_name: &str) -> Option<&PrefixedTool> {
        let (backend, pos) = self.index.get(prefixed_name)?;
        self.slices.get(backend).and_then(|slice| slice.get(*pos))
    }

    pub fn backend_tools(&self, backend: &str) -> &[PrefixedTool] {
        self.slices.get(backend).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concatenate slices following `backend_order`.
    pub fn tools_in_order<'a>(&self, backend_order: impl IntoIterator<Item = &'a str>) -> Vec<PrefixedTool> {
        backend_order
            .into_iter()
            .flat_map(|backend| self.backend_tools(backend).iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slices.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First line of a tool description, without a leading pictograph.
///
/// Backends often put multi-line agent guidance in descriptions; clients
/// only get the summary line, the full text stays in the cache.
pub fn compact_description(description: &str) -> String {
    let first_line = description.lines().next().unwrap_or("").trim();

    let mut chars = first_line.chars();
    let stripped = match chars.next() {
        Some(c) if ('\u{1F300}'..='\u{1F9FF}').contains(&c) => chars.as_str().trim_start(),
        _ => first_line,
    };

    if stripped.is_empty() {
        first_line.to_string()
    } else {
        stripped.to_string()
    }
}
