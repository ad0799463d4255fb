//! Organ System → Group → Variable navigation tree.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use varmap_model::columns::UNKNOWN_SENTINEL;
use varmap_model::{Row, RowKey, Table};

use crate::normalize::fill_hierarchy;
use crate::rowkey::content_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    /// `<Organ System>`, `<Organ System>/<Group>` or `ROW:<key>` for leaves.
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tree {
    pub roots: Vec<TreeNode>,
}

impl Tree {
    /// Values of every non-leaf node, outermost first.
    pub fn expandable_values(&self) -> Vec<String> {
        let mut values = Vec::new();
        for organ in &self.roots {
            values.push(organ.value.clone());
            for group in &organ.children {
                values.push(group.value.clone());
            }
        }
        values
    }

    pub fn leaf_count(&self) -> usize {
        self.roots
            .iter()
            .flat_map(|organ| &organ.children)
            .map(|group| group.children.len())
            .sum()
    }

    /// Leaves in display order.
    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.roots
            .iter()
            .flat_map(|organ| &organ.children)
            .flat_map(|group| &group.children)
    }
}

/// Leaf value (`ROW:<key>`) to the row it stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafLookup {
    rows: BTreeMap<String, Row>,
}

impl LeafLookup {
    pub fn get(&self, leaf_value: &str) -> Option<&Row> {
        self.rows.get(leaf_value)
    }

    pub fn get_by_key(&self, key: &RowKey) -> Option<&Row> {
        self.rows.get(&key.leaf_value())
    }

    pub fn contains_key(&self, key: &RowKey) -> bool {
        self.get_by_key(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = (&String, &Row)> {
        self.rows.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeBuild {
    pub tree: Tree,
    pub lookup: LeafLookup,
}

/// `Variable`, plus ` (<Source>)` when the row has a source.
pub fn leaf_label(row: &Row) -> String {
    let variable = row.variable().unwrap_or(UNKNOWN_SENTINEL);
    match row.source() {
        Some(source) => format!("{variable} ({source})"),
        None => variable.to_string(),
    }
}

struct Leaf {
    variable: String,
    label: String,
    key: RowKey,
}

/// Build the navigation tree and leaf lookup for `table`.
///
/// Rows without a key are keyed over their own cells. Rows sharing a
/// key collapse to the last one. Every level is sorted by label.
pub fn build_tree(table: &Table) -> TreeBuild {
    let mut unique: BTreeMap<RowKey, Row> = BTreeMap::new();
    let mut collapsed = 0usize;
    for row in table.rows() {
        let mut row = row.clone();
        fill_hierarchy(&mut row, UNKNOWN_SENTINEL);
        let key = match &row.key {
            Some(key) => key.clone(),
            None => {
                let key = content_key(&row);
                row.key = Some(key.clone());
                key
            }
        };
        if unique.insert(key, row).is_some() {
            collapsed += 1;
        }
    }

    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<Leaf>>> = BTreeMap::new();
    let mut lookup = LeafLookup::default();
    for (key, row) in unique {
        let organ = row.organ_system().unwrap_or(UNKNOWN_SENTINEL).to_string();
        let group = row.group().unwrap_or(UNKNOWN_SENTINEL).to_string();
        grouped.entry(organ).or_default().entry(group).or_default().push(Leaf {
            variable: row.variable().unwrap_or(UNKNOWN_SENTINEL).to_string(),
            label: leaf_label(&row),
            key: key.clone(),
        });
        lookup.rows.insert(key.leaf_value(), row);
    }

    let roots = grouped
        .into_iter()
        .map(|(organ, groups)| {
            let children = groups
                .into_iter()
                .map(|(group, mut leaves)| {
                    leaves.sort_by(|a, b| {
                        a.variable
                            .cmp(&b.variable)
                            .then_with(|| a.label.cmp(&b.label))
                            .then_with(|| a.key.cmp(&b.key))
                    });
                    TreeNode {
                        label: group.clone(),
                        value: format!("{organ}/{group}"),
                        children: leaves
                            .into_iter()
                            .map(|leaf| TreeNode {
                                label: leaf.label,
                                value: leaf.key.leaf_value(),
                                children: Vec::new(),
                            })
                            .collect(),
                    }
                })
                .collect();
            TreeNode {
                label: organ.clone(),
                value: organ,
                children,
            }
        })
        .collect();

    let tree = Tree { roots };
    debug!(
        leaf_count = tree.leaf_count(),
        collapsed, "navigation tree built"
    );
    TreeBuild { tree, lookup }
}
