//! Abgeleiteter Anzeige-Baum. Eltern-Links sind Schlüssel, keine Zeiger.

use crate::core::EntityKind;
use serde::Serialize;
use std::collections::HashMap;

/// Art eines Sidebar-Knotens: Entity oder synthetische Gruppe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "kind", rename_all = "kebab-case")]
pub enum SidebarKind {
    Group,
    Entity(EntityKind),
}

/// Verschachtelte Darstellung für Anzeige und als Eingabe für `load`/`add_child`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarItem {
    pub kind: SidebarKind,
    pub key: String,
    pub name: String,
    pub children: Vec<SidebarItem>,
}

impl SidebarItem {
    pub fn leaf(kind: SidebarKind, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Sucht einen Knoten im Teilbaum.
    pub fn find(&self, key: &str) -> Option<&SidebarItem> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    /// Zählt Knoten einer Art im Teilbaum (inklusive sich selbst).
    pub fn count(&self, kind: SidebarKind) -> usize {
        let own = usize::from(self.kind == kind);
        own + self.children.iter().map(|c| c.count(kind)).sum::<usize>()
    }
}

#[derive(Debug)]
struct TreeNode {
    kind: SidebarKind,
    name: String,
    parent: Option<String>,
    children: Vec<String>,
}

/// Registry aller Knoten, adressiert über zusammengesetzte Schlüssel.
#[derive(Debug, Default)]
pub struct SidebarTree {
    nodes: HashMap<String, TreeNode>,
    root: Option<String>,
}

impl SidebarTree {
    /// Ersetzt den gesamten Baum.
    pub fn load(&mut self, root: SidebarItem) {
        self.nodes.clear();
        self.root = Some(root.key.clone());
        self.register(root, None);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Hängt `item` samt Teilbaum an `parent_key` an und liefert den konvertierten Elternknoten.
    pub fn add_child(&mut self, item: SidebarItem, parent_key: &str) -> Option<SidebarItem> {
        if !self.nodes.contains_key(parent_key) {
            return None;
        }
        if self.nodes.contains_key(&item.key) {
            log::warn!("Sidebar: Schlüssel '{}' existiert bereits", item.key);
            return None;
        }
        let key = item.key.clone();
        self.register(item, Some(parent_key.to_string()));
        self.nodes.get_mut(parent_key)?.children.push(key);
        self.convert(parent_key)
    }

    pub fn update_name(&mut self, key: &str, name: String) -> Option<SidebarItem> {
        self.nodes.get_mut(key)?.name = name;
        self.convert(key)
    }

    /// Löst den Knoten vom Elternknoten und liefert den konvertierten Elternknoten.
    pub fn remove(&mut self, key: &str) -> Option<SidebarItem> {
        let parent = self.nodes.get(key)?.parent.clone()?;
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|child| child != key);
        }
        self.unregister(key);
        self.convert(&parent)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Verschachtelte Kopie ab `key`. Kinder unterhalb der Wurzel werden nach Name sortiert.
    pub fn convert(&self, key: &str) -> Option<SidebarItem> {
        let node = self.nodes.get(key)?;
        let mut children: Vec<SidebarItem> =
            node.children.iter().filter_map(|c| self.convert(c)).collect();
        if self.root.as_deref() != Some(key) {
            children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key.cmp(&b.key)));
        }
        Some(SidebarItem {
            kind: node.kind,
            key: key.to_string(),
            name: node.name.clone(),
            children,
        })
    }

    pub fn to_tree(&self) -> Option<SidebarItem> {
        self.convert(self.root.as_deref()?)
    }

    fn register(&mut self, item: SidebarItem, parent: Option<String>) {
        let SidebarItem {
            kind,
            key,
            name,
            children,
        } = item;
        let child_keys = children.iter().map(|c| c.key.clone()).collect();
        self.nodes.insert(
            key.clone(),
            TreeNode {
                kind,
                name,
                parent,
                children: child_keys,
            },
        );
        for child in children {
            self.register(child, Some(key.clone()));
        }
    }

    fn unregister(&mut self, key: &str) {
        if let Some(node) = self.nodes.remove(key) {
            for child in node.children {
                self.unregister(&child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(key: &str, name: &str, children: Vec<SidebarItem>) -> SidebarItem {
        SidebarItem {
            kind: SidebarKind::Group,
            key: key.to_string(),
            name: name.to_string(),
            children,
        }
    }

    fn node(key: &str, name: &str) -> SidebarItem {
        SidebarItem::leaf(SidebarKind::Entity(EntityKind::Node), key, name)
    }

    fn sample_tree() -> SidebarTree {
        let mut tree = SidebarTree::default();
        tree.load(group(
            "root",
            "net",
            vec![
                group("z", "Zeta", vec![node("n1", "b"), node("n2", "a")]),
                group("a", "Alpha", vec![]),
            ],
        ));
        tree
    }

    #[test]
    fn root_children_keep_insertion_order_others_sorted() {
        let tree = sample_tree();
        let root = tree.to_tree().expect("Wurzel erwartet");

        let groups: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(groups, vec!["Zeta", "Alpha"]);
        let names: Vec<&str> = root.children[0]
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn add_child_to_unknown_parent_is_noop() {
        let mut tree = sample_tree();
        let before = tree.len();
        assert!(tree.add_child(node("n3", "c"), "missing").is_none());
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn add_child_returns_parent_subtree() {
        let mut tree = sample_tree();
        let parent = tree.add_child(node("n3", "0"), "a").expect("Elternknoten erwartet");
        assert_eq!(parent.key, "a");
        assert_eq!(parent.children.len(), 1);
        assert!(tree.contains("n3"));
    }

    #[test]
    fn update_name_changes_sort_position() {
        let mut tree = sample_tree();
        let updated = tree
            .update_name("n1", "0".to_string())
            .expect("Knoten erwartet");
        assert_eq!(updated.name, "0");
        assert!(tree.update_name("missing", "x".to_string()).is_none());

        let root = tree.to_tree().expect("Wurzel erwartet");
        assert_eq!(root.children[0].children[0].key, "n1");
    }

    #[test]
    fn remove_unregisters_subtree() {
        let mut tree = sample_tree();
        let parent = tree.remove("z").expect("Wurzel als Elternknoten erwartet");
        assert_eq!(parent.key, "root");
        assert!(!tree.contains("n1"));
        assert!(!tree.contains("n2"));

        // Wurzel hat keinen Elternknoten
        assert!(tree.remove("root").is_none());
        assert!(tree.remove("missing").is_none());
    }

    #[test]
    fn count_by_kind() {
        let tree = sample_tree();
        let root = tree.to_tree().expect("Wurzel erwartet");
        assert_eq!(root.count(SidebarKind::Entity(EntityKind::Node)), 2);
        assert_eq!(root.count(SidebarKind::Group), 3);
    }
}
