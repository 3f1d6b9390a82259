//! Declarative condition → category table.
//!
//! The table is parsed once at startup from YAML (normally the embedded UKMEC summary) and
//! never mutated afterwards. Parsing is strict: unknown fields, unknown method codes and
//! categories outside 1..=4 are rejected with the path of the offending field.

use super::{Category, Method, MethodCategories};
use crate::constants::UKMEC_TABLE_YAML;
use crate::{CdsError, CdsResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One condition's contribution per method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionRow {
    /// Human readable description of the risk-factor state.
    pub description: String,

    /// Category per method. A missing method contributes category 1.
    pub categories: BTreeMap<Method, Category>,
}

impl ConditionRow {
    pub fn category_for(&self, method: Method) -> Category {
        self.categories
            .get(&method)
            .copied()
            .unwrap_or(Category::UNRESTRICTED)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableWire {
    conditions: BTreeMap<String, ConditionRow>,
}

/// Static mapping from condition key to [`ConditionRow`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EligibilityTable {
    conditions: BTreeMap<String, ConditionRow>,
}

impl EligibilityTable {
    /// Load the UKMEC 2016 summary table embedded in this crate.
    ///
    /// # Errors
    ///
    /// Returns [`CdsError`] if the embedded document fails its schema, which indicates a
    /// packaging defect rather than a runtime condition.
    pub fn ukmec() -> CdsResult<Self> {
        Self::parse(UKMEC_TABLE_YAML)
    }

    /// Parse a table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`CdsError::TableSchema`] naming the failing field when the YAML does not match
    /// the table schema (unknown keys, unknown methods, categories outside 1..=4), or when a
    /// condition key is blank.
    pub fn parse(yaml_text: &str) -> CdsResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, TableWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CdsError::TableSchema(format!("at {path}: {source}")));
            }
        };

        if wire.conditions.keys().any(|k| k.trim().is_empty()) {
            return Err(CdsError::TableSchema(
                "condition keys cannot be blank".into(),
            ));
        }

        tracing::debug!("loaded eligibility table with {} conditions", wire.conditions.len());

        Ok(Self {
            conditions: wire.conditions,
        })
    }

    /// Combine the selected conditions into one category per method.
    ///
    /// Each method starts at category 1 and is raised to the highest category any selected
    /// condition assigns it. Unknown keys are skipped and duplicates have no effect, so the
    /// result does not depend on order or repetition.
    pub fn combine<I, S>(&self, selected: I) -> MethodCategories
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = MethodCategories::unrestricted();
        for key in selected {
            let key = key.as_ref();
            match self.conditions.get(key) {
                Some(row) => {
                    for (method, category) in &row.categories {
                        result.raise(*method, *category);
                    }
                }
                None => tracing::debug!("ignoring unknown condition key {key:?}"),
            }
        }
        result
    }

    /// Selected keys that contribute a category 2 or 3 to `method`.
    ///
    /// When two or more keys come back the combined category may understate the risk; this is
    /// reported for display only and does not change [`EligibilityTable::combine`].
    pub fn overlapping_conditions<'a, I, S>(&'a self, selected: I, method: Method) -> Vec<&'a str>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = selected
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .collect();

        self.conditions
            .iter()
            .filter(|(key, row)| {
                unique.contains(key.as_str()) && row.category_for(method).is_intermediate()
            })
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn row(&self, key: &str) -> Option<&ConditionRow> {
        self.conditions.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.conditions.contains_key(key)
    }

    /// Condition keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionRow)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_loads() {
        let table = EligibilityTable::ukmec().expect("embedded table");
        assert_eq!(table.len(), 43);
        assert!(table.contains("BMI_GE_35"));
        assert!(table.contains("THROMBO_MUTATION"));
        assert_eq!(
            table.row("PAST_ECTOPIC").unwrap().category_for(Method::Pop),
            Category::UNRESTRICTED
        );
    }

    #[test]
    fn rejects_category_out_of_range() {
        let input = r#"conditions:
  BAD:
    description: "bad"
    categories:
      CHC: 5
"#;
        let err = EligibilityTable::parse(input).expect_err("category 5 is invalid");
        match err {
            CdsError::TableSchema(msg) => assert!(msg.contains("BAD"), "{msg}"),
            other => panic!("expected TableSchema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_method() {
        let input = r#"conditions:
  SOMETHING:
    description: "x"
    categories:
      PATCH: 2
"#;
        let err = EligibilityTable::parse(input).expect_err("unknown method");
        assert!(matches!(err, CdsError::TableSchema(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let input = r#"conditions:
  SOMETHING:
    description: "x"
    categories: {}
    notes: "unexpected"
"#;
        let err = EligibilityTable::parse(input).expect_err("unknown field");
        match err {
            CdsError::TableSchema(msg) => assert!(msg.contains("notes"), "{msg}"),
            other => panic!("expected TableSchema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_keys() {
        let input = r#"conditions:
  " ":
    description: "x"
    categories: {}
"#;
        assert!(EligibilityTable::parse(input).is_err());
    }

    #[test]
    fn overlapping_conditions_lists_intermediate_contributors() {
        let table = EligibilityTable::ukmec().unwrap();
        let selected = ["BMI_GE_35", "SMOKE_GE_35_LT15", "SMOKE_GE_35_GE15", "BMI_GE_35"];
        let overlapping = table.overlapping_conditions(selected, Method::Chc);
        assert_eq!(overlapping, vec!["BMI_GE_35", "SMOKE_GE_35_LT15"]);
        assert!(table.overlapping_conditions(selected, Method::CuIud).is_empty());
    }

    #[test]
    fn custom_table_combines_by_maximum() {
        let input = r#"conditions:
  A:
    description: "a"
    categories:
      POP: 2
      CHC: 3
  B:
    description: "b"
    categories:
      POP: 3
"#;
        let table = EligibilityTable::parse(input).unwrap();
        let result = table.combine(["A", "B"]);
        assert_eq!(result.get(Method::Pop).value(), 3);
        assert_eq!(result.get(Method::Chc).value(), 3);
        assert_eq!(result.get(Method::Implant).value(), 1);
    }
}
