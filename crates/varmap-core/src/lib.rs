//! Row identity and merge engine for variable mapping tables.
//!
//! The base table is loaded once and shared; each session layers an overlay
//! of uploaded and manually added rows on top of it. The master view drives
//! the navigation tree, and selections refer to rows by content-derived key
//! so they survive uploads and tree rebuilds.

pub mod base;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod rowkey;
pub mod selection;
pub mod session;
pub mod tree;

pub use base::{base_table_from_csv, load_base_table};
pub use error::{CoreError, Result};
pub use merge::{
    MatchPolicy, MergeAction, MergeOutcome, MergeSummary, NewVariable, ProcessedRow,
    add_manual_row, master_table, merge_upload,
};
pub use normalize::{ensure_hierarchy_columns, fill_hierarchy, hierarchy_columns};
pub use rowkey::{canonical_payload, content_key, row_key, sha256_hex};
pub use selection::{Selection, normalize_leaf_value, normalize_leaf_values};
pub use session::{SessionContext, UploadReport};
pub use tree::{LeafLookup, Tree, TreeBuild, TreeNode, build_tree, leaf_label};
