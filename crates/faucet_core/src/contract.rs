//! Schema-contract drift detector (§4.7). Mode-agnostic: `LockMode`
//! interpretation (what to do about drift) is the caller's concern, not
//! the differ's.

use crate::types::{Column, TableSchema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    None,
    Auto,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    Additive,
    Breaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftCategory {
    ColumnAdded,
    ColumnRemoved,
    TypeChanged,
    NullabilityChanged,
    TableRemoved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftItem {
    pub column: String,
    pub category: DriftCategory,
    pub drift_type: DriftType,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftReport {
    pub table: String,
    pub items: Vec<DriftItem>,
    pub additive_count: u32,
    pub breaking_count: u32,
    pub has_breaking: bool,
    pub has_drift: bool,
}

impl DriftReport {
    fn push(&mut self, item: DriftItem) {
        match item.drift_type {
            DriftType::Additive => self.additive_count += 1,
            DriftType::Breaking => {
                self.breaking_count += 1;
                self.has_breaking = true;
            }
        }
        self.has_drift = true;
        self.items.push(item);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDriftReport {
    pub tables: Vec<DriftReport>,
    pub has_breaking: bool,
    pub has_drift: bool,
}

/// Compare a locked contract snapshot against the live introspected schema
/// for one table.
pub fn diff_table(locked: &TableSchema, live: &TableSchema) -> DriftReport {
    let mut report = DriftReport {
        table: locked.name.clone(),
        ..Default::default()
    };

    let locked_by_name: std::collections::BTreeMap<&str, &Column> =
        locked.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let live_by_name: std::collections::BTreeMap<&str, &Column> =
        live.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for (name, locked_col) in &locked_by_name {
        match live_by_name.get(name) {
            None => report.push(DriftItem {
                column: name.to_string(),
                category: DriftCategory::ColumnRemoved,
                drift_type: DriftType::Breaking,
                detail: format!("column '{name}' removed"),
            }),
            Some(live_col) => {
                if locked_col.sql_type != live_col.sql_type {
                    report.push(DriftItem {
                        column: name.to_string(),
                        category: DriftCategory::TypeChanged,
                        drift_type: DriftType::Breaking,
                        detail: format!(
                            "type changed from '{}' to '{}'",
                            locked_col.sql_type, live_col.sql_type
                        ),
                    });
                }
                match (locked_col.nullable, live_col.nullable) {
                    (true, false) => report.push(DriftItem {
                        column: name.to_string(),
                        category: DriftCategory::NullabilityChanged,
                        drift_type: DriftType::Breaking,
                        detail: format!("column '{name}' became NOT NULL"),
                    }),
                    (false, true) => report.push(DriftItem {
                        column: name.to_string(),
                        category: DriftCategory::NullabilityChanged,
                        drift_type: DriftType::Additive,
                        detail: format!("column '{name}' became nullable"),
                    }),
                    _ => {}
                }
            }
        }
    }

    for name in live_by_name.keys() {
        if !locked_by_name.contains_key(name) {
            report.push(DriftItem {
                column: name.to_string(),
                category: DriftCategory::ColumnAdded,
                drift_type: DriftType::Additive,
                detail: format!("column '{name}' added"),
            });
        }
    }

    report
}

/// Fold `diff_table` across every table in a contract. A locked table
/// missing from `live_tables` yields one synthetic breaking item named
/// `"table_removed"` rather than being silently skipped.
pub fn diff_service(locked_tables: &[TableSchema], live_tables: &[TableSchema]) -> ServiceDriftReport {
    let live_by_name: std::collections::BTreeMap<&str, &TableSchema> =
        live_tables.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut report = ServiceDriftReport::default();

    for locked in locked_tables {
        let table_report = match live_by_name.get(locked.name.as_str()) {
            Some(live) => diff_table(locked, live),
            None => {
                let mut r = DriftReport {
                    table: locked.name.clone(),
                    ..Default::default()
                };
                r.push(DriftItem {
                    column: String::new(),
                    category: DriftCategory::TableRemoved,
                    drift_type: DriftType::Breaking,
                    detail: "table_removed".to_string(),
                });
                r
            }
        };

        report.has_breaking |= table_report.has_breaking;
        report.has_drift |= table_report.has_drift;
        report.tables.push(table_report);
    }

    report
}
