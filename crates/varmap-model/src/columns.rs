//! Well-known column names and the internal-column convention.

/// Required column of every upload and of the base table.
pub const VARIABLE: &str = "Variable";
pub const ORGAN_SYSTEM: &str = "Organ System";
pub const GROUP: &str = "Group";
pub const SOURCE: &str = "Source";
pub const EPIC_ID: &str = "EPIC ID";
pub const PDMS_ID: &str = "PDMS ID";
pub const UNIT: &str = "Unit";

/// Derived provenance label added on export.
pub const ORIGIN: &str = "Origin";

/// Columns starting with this prefix are internal and never part of a row's identity.
pub const INTERNAL_PREFIX: &str = "__";

/// Internal column carrying the row key when a keyed table is written out.
pub const ROW_KEY_COLUMN: &str = "__row_key__";

/// Navigation levels, outermost first.
pub const HIERARCHY: [&str; 3] = [ORGAN_SYSTEM, GROUP, VARIABLE];

/// Fill value for a missing `Organ System` or `Group` in loaded or uploaded rows.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// Fill value for a blank `Organ System` or `Group` in a manually added row.
pub const GENERAL_SENTINEL: &str = "General";

/// Leading columns of an export, in order. Other columns follow in table order.
pub const PREFERRED_EXPORT_ORDER: [&str; 8] = [
    VARIABLE,
    ORGAN_SYSTEM,
    GROUP,
    SOURCE,
    EPIC_ID,
    PDMS_ID,
    UNIT,
    ORIGIN,
];

pub fn is_internal_column(name: &str) -> bool {
    name.starts_with(INTERNAL_PREFIX)
}
