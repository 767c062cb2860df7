// src/filters.rs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::records::{Case, TimeEntry};

/// One requested narrowing: a declared field name and the values to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEntry {
    pub field: String,
    #[serde(default)]
    pub selected_values: Vec<String>,
}

impl FilterEntry {
    pub fn new(field: &str, values: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            selected_values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// What the narrowing saw for one field: the applied selection plus the
/// options on offer before this field's own filter ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    pub field: String,
    pub selected_values: Vec<String>,
    pub options: Vec<String>,
}

/// Maps a declared field name to its accessor on the row type. Rows without a
/// value for the field contribute no option and never survive a filter on it.
pub struct FieldDef<R> {
    pub name: &'static str,
    pub get: fn(&R) -> Option<String>,
}

/// Ordered set of filterable fields for one dataset kind. The declaration
/// order is the narrowing order: each field's options reflect the rows left
/// after every earlier field's filter has been applied.
pub struct FieldRegistry<R> {
    fields: Vec<FieldDef<R>>,
}

impl<R: Clone> FieldRegistry<R> {
    pub fn new(fields: Vec<FieldDef<R>>) -> Self {
        Self { fields }
    }

    pub fn declared_fields(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Sorted distinct values of one field, nulls excluded. Empty for an
    /// undeclared field.
    pub fn distinct_options(&self, field: &str, rows: &[R]) -> Vec<String> {
        let Some(def) = self.fields.iter().find(|f| f.name == field) else {
            return Vec::new();
        };
        let distinct: BTreeSet<String> = rows.iter().filter_map(|row| (def.get)(row)).collect();
        distinct.into_iter().collect()
    }

    /// Applies a filter spec field by field, in declaration order, recording
    /// the pre-narrowing options for each field along the way. Filters naming
    /// undeclared fields are logged and ignored.
    pub fn apply(&self, rows: Vec<R>, spec: &[FilterEntry]) -> (Vec<R>, Vec<FieldOptions>) {
        for entry in spec {
            if !self.fields.iter().any(|f| f.name == entry.field) {
                warn!("Ignoring filter on undeclared field: {}", entry.field);
            }
        }

        let mut narrowed = rows;
        let mut report = Vec::with_capacity(self.fields.len());
        for def in &self.fields {
            let options = self.distinct_options(def.name, &narrowed);
            let selected = spec
                .iter()
                .find(|e| e.field == def.name)
                .map(|e| e.selected_values.clone())
                .unwrap_or_default();
            if !selected.is_empty() {
                narrowed.retain(|row| match (def.get)(row) {
                    Some(value) => selected.iter().any(|s| *s == value),
                    None => false,
                });
            }
            report.push(FieldOptions {
                field: def.name.to_string(),
                selected_values: selected,
                options,
            });
        }
        (narrowed, report)
    }
}

// --- Registries ---

/// Filterable fields of the timesheet dataset.
pub static TIMESHEET_FIELDS: Lazy<FieldRegistry<TimeEntry>> = Lazy::new(|| {
    FieldRegistry::new(vec![
        FieldDef { name: "Kind", get: |e: &TimeEntry| Some(e.kind.to_string()) },
        FieldDef { name: "ClientName", get: |e: &TimeEntry| Some(e.client_name.clone()) },
        FieldDef { name: "WorkerName", get: |e: &TimeEntry| Some(e.worker_name.clone()) },
        FieldDef { name: "Sponsor", get: |e: &TimeEntry| e.sponsor.clone() },
        FieldDef {
            name: "AccountManagerName",
            get: |e: &TimeEntry| e.account_manager_name.clone(),
        },
        FieldDef {
            name: "ProductsOrServices",
            get: |e: &TimeEntry| e.products_or_services.clone(),
        },
    ])
});

/// Filterable fields of the case dataset used by the revenue reports.
pub static CASE_FIELDS: Lazy<FieldRegistry<Case>> = Lazy::new(|| {
    FieldRegistry::new(vec![
        FieldDef { name: "ClientName", get: |c: &Case| Some(c.client_name.clone()) },
        FieldDef {
            name: "AccountManagerName",
            get: |c: &Case| c.account_manager_name.clone(),
        },
        FieldDef { name: "Sponsor", get: |c: &Case| c.sponsor.clone() },
        FieldDef { name: "ProductsOrServices", get: |c: &Case| c.offer_name.clone() },
    ])
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Kind;
    use chrono::NaiveDate;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn entry(worker: &str, client: &str, kind: Kind, sponsor: Option<&str>) -> TimeEntry {
        TimeEntry {
            date: d("2023-05-10"),
            hours: 4.0,
            worker_id: format!("w-{}", worker),
            worker_name: worker.to_string(),
            worker_slug: worker.to_lowercase(),
            client_id: format!("c-{}", client),
            client_name: client.to_string(),
            case_id: "case-1".to_string(),
            case_title: "Case One".to_string(),
            sponsor: sponsor.map(|s| s.to_string()),
            account_manager_name: None,
            kind,
            products_or_services: None,
            week: String::new(),
            created_at: d("2023-05-10").and_hms_opt(12, 0, 0).unwrap(),
            correctness: String::new(),
            comment: None,
        }
        .normalize()
    }

    fn sample_rows() -> Vec<TimeEntry> {
        vec![
            entry("Alice", "Acme", Kind::Consulting, Some("CTO")),
            entry("Bob", "Acme", Kind::Squad, None),
            entry("Alice", "Globex", Kind::Consulting, Some("CFO")),
            entry("Carol", "Globex", Kind::Internal, None),
        ]
    }

    #[test]
    fn distinct_options_are_sorted_and_null_free() {
        let rows = sample_rows();
        let options = TIMESHEET_FIELDS.distinct_options("Sponsor", &rows);
        assert_eq!(options, vec!["CFO".to_string(), "CTO".to_string()]);
    }

    #[test]
    fn unknown_field_is_ignored_not_fatal() {
        let rows = sample_rows();
        let spec = vec![FilterEntry::new("NoSuchField", &["x"])];
        let (narrowed, _) = TIMESHEET_FIELDS.apply(rows.clone(), &spec);
        assert_eq!(narrowed.len(), rows.len());
    }

    #[test]
    fn filtering_is_idempotent() {
        let spec = vec![FilterEntry::new("ClientName", &["Acme"])];
        let (once, _) = TIMESHEET_FIELDS.apply(sample_rows(), &spec);
        let (twice, _) = TIMESHEET_FIELDS.apply(once.clone(), &spec);
        assert_eq!(once, twice);
    }

    #[test]
    fn later_fields_see_rows_narrowed_by_earlier_fields() {
        // Kind is declared before ClientName, so the client options must
        // reflect only consulting rows, while the kind options stay complete.
        let spec = vec![FilterEntry::new("Kind", &["Consulting"])];
        let (narrowed, report) = TIMESHEET_FIELDS.apply(sample_rows(), &spec);

        assert_eq!(narrowed.len(), 2);
        let kind_options = &report.iter().find(|f| f.field == "Kind").unwrap().options;
        assert_eq!(kind_options.len(), 3, "kind options predate its own filter");
        let client_options = &report.iter().find(|f| f.field == "ClientName").unwrap().options;
        assert_eq!(client_options, &vec!["Acme".to_string(), "Globex".to_string()]);

        let worker_options = &report.iter().find(|f| f.field == "WorkerName").unwrap().options;
        assert_eq!(worker_options, &vec!["Alice".to_string()]);
    }

    #[test]
    fn rows_without_a_value_never_survive_a_filter_on_that_field() {
        let spec = vec![FilterEntry::new("Sponsor", &["CTO"])];
        let (narrowed, _) = TIMESHEET_FIELDS.apply(sample_rows(), &spec);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].worker_name, "Alice");
        assert_eq!(narrowed[0].client_name, "Acme");
    }

    #[test]
    fn report_lists_every_declared_field_in_order() {
        let (_, report) = TIMESHEET_FIELDS.apply(sample_rows(), &[]);
        let fields: Vec<&str> = report.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["Kind", "ClientName", "WorkerName", "Sponsor", "AccountManagerName", "ProductsOrServices"]
        );
    }
}
