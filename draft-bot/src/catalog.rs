// The pool of draftable items, loaded once from a static ordered list.

use serde::{Deserialize, Serialize};

/// Maximum number of matches returned by a catalog search. Queries that hit
/// more items than this are reported truncated rather than flooding the
/// channel.
pub const SEARCH_MAX_LENGTH: usize = 8;

/// A single draftable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier, case-normalized from the display name.
    pub id: String,
    /// The name as it appeared in the catalog list.
    pub display_name: String,
    /// Whether the item has been committed to a participant. Transitions
    /// false -> true exactly once, only by a pick commit.
    pub taken: bool,
}

/// Normalize a display name into a stable item id.
pub fn normalize_id(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The catalog of all draftable items. Iteration order is the order of the
/// source list; ids are unique within the catalog.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
}

impl ItemCatalog {
    /// Build a catalog from display names, in order. Blank entries are
    /// skipped; a repeated name keeps its first occurrence.
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut items: Vec<Item> = Vec::new();
        for name in names {
            let display_name = name.as_ref().trim();
            if display_name.is_empty() {
                continue;
            }
            let id = normalize_id(display_name);
            if items.iter().any(|i| i.id == id) {
                continue;
            }
            items.push(Item {
                id,
                display_name: display_name.to_string(),
                taken: false,
            });
        }
        ItemCatalog { items }
    }

    /// Rebuild a catalog from previously persisted items.
    pub fn from_items(items: Vec<Item>) -> Self {
        ItemCatalog { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by its exact id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Mark an item as taken. Returns false if the id is unknown.
    pub fn mark_taken(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.taken = true;
                true
            }
            None => false,
        }
    }

    /// Substring search over item ids, capped at [`SEARCH_MAX_LENGTH`]
    /// results. The fragment is lowercased before matching; results come
    /// back in catalog order. Taken items are included; callers that care
    /// filter on `taken`.
    pub fn search(&self, fragment: &str) -> Vec<&Item> {
        let fragment = fragment.trim().to_lowercase();
        self.items
            .iter()
            .filter(|i| i.id.contains(&fragment))
            .take(SEARCH_MAX_LENGTH)
            .collect()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }
}
