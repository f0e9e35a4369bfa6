//! Alias table resolving free-text subtype terms to canonical ALLIUM ids

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PreproError, Result};

/// Marker prefix of an unrecognized term when rendered as text
pub const UNRECOGNIZED_PREFIX: &str = "UNRECOGNIZED_SUBTYPE";

const BUILTIN_SUBTYPES: &str = include_str!("../../data/subtypes.yml");

#[derive(Debug, Deserialize)]
struct SubtypeTable {
    subtypes: Vec<SubtypeEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtypeEntry {
    id: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

/// Result of looking up one term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Canonical subtype id
    Known(String),
    /// Term (whitespace-stripped) absent from the alias table
    Unrecognized(String),
}

impl Translation {
    pub fn is_known(&self) -> bool {
        matches!(self, Translation::Known(_))
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Known(id) => write!(f, "{}", id),
            Translation::Unrecognized(term) => write!(f, "{}: {}", UNRECOGNIZED_PREFIX, term),
        }
    }
}

/// Immutable alias -> canonical id table
///
/// Built once at startup and shared by reference with every component that
/// resolves subtype labels.
#[derive(Debug, Clone)]
pub struct SubtypeThesaurus {
    /// Canonical ids in table order
    ids: Vec<String>,
    /// Ids named as a parent by at least one subtype
    groups: BTreeSet<String>,
    /// Alias (and id) -> canonical id
    lookup: HashMap<String, String>,
}

impl SubtypeThesaurus {
    /// The vocabulary shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_SUBTYPES)
    }

    /// Load a vocabulary from a YAML file with a top-level `subtypes` list
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let table: SubtypeTable = serde_yaml::from_str(yaml)?;

        let mut ids = Vec::with_capacity(table.subtypes.len());
        let mut groups = BTreeSet::new();
        let mut lookup: HashMap<String, String> = HashMap::new();

        for entry in &table.subtypes {
            let id = entry.id.trim();
            if id.is_empty() {
                return Err(PreproError::InvalidSubtypeTable {
                    reason: "subtype with an empty id".to_string(),
                });
            }
            if ids.iter().any(|known| known == id) {
                return Err(PreproError::InvalidSubtypeTable {
                    reason: format!("subtype '{}' is defined twice", id),
                });
            }
            ids.push(id.to_string());
            if let Some(parent) = &entry.parent_id {
                groups.insert(parent.trim().to_string());
            }
        }

        // ids first so an alias can never shadow a canonical id
        for id in &ids {
            lookup.insert(id.clone(), id.clone());
        }
        for entry in &table.subtypes {
            let id = entry.id.trim();
            for alias in &entry.aliases {
                let alias = alias.trim();
                match lookup.get(alias) {
                    Some(existing) if existing != id => {
                        return Err(PreproError::InvalidSubtypeTable {
                            reason: format!("alias '{}' maps to both '{}' and '{}'", alias, existing, id),
                        });
                    }
                    Some(_) => {}
                    None => {
                        lookup.insert(alias.to_string(), id.to_string());
                    }
                }
            }
        }

        for group in &groups {
            if !ids.contains(group) {
                log::warn!("Subtype group '{}' is not itself a subtype id", group);
            }
        }

        log::debug!(
            "Loaded {} subtypes ({} groups, {} lookup terms)",
            ids.len(),
            groups.len(),
            lookup.len()
        );
        Ok(Self { ids, groups, lookup })
    }

    /// Resolve a term; surrounding whitespace is ignored
    pub fn translate(&self, term: &str) -> Translation {
        let term = term.trim();
        match self.lookup.get(term) {
            Some(id) => Translation::Known(id.clone()),
            None => Translation::Unrecognized(term.to_string()),
        }
    }

    /// Resolve a comma-delimited composite term component-wise
    ///
    /// Unrecognized components are rendered with their sentinel text.
    pub fn translate_list(&self, terms: &str) -> String {
        terms
            .split(',')
            .map(|t| self.translate(t).to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// [`translate_list`](Self::translate_list) over a column of labels
    pub fn translate_column(&self, column: &[String]) -> Vec<String> {
        column.iter().map(|entry| self.translate_list(entry)).collect()
    }

    /// Whether `term` is a canonical id (aliases do not count)
    pub fn is_known(&self, term: &str) -> bool {
        self.ids.iter().any(|id| id == term)
    }

    /// Canonical ids in table order; without groups, ids that are the parent of
    /// another subtype are left out
    pub fn all_subtypes(&self, include_groups: bool) -> Vec<&str> {
        self.ids
            .iter()
            .filter(|id| include_groups || !self.groups.contains(*id))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
subtypes:
  - id: B-other
  - id: T-ALL
  - id: Ph-group
  - id: BCR-ABL1
    parent_id: Ph-group
    aliases: [Ph, "BCR::ABL1"]
  - id: BCR-ABL1-like
    parent_id: Ph-group
    aliases: [Ph-like]
  - id: HYPERDIPLOID
    aliases: [Hyperdiploid]
"#;

    fn thesaurus() -> SubtypeThesaurus {
        SubtypeThesaurus::from_yaml_str(TABLE).unwrap()
    }

    #[test]
    fn test_translate_aliases_and_ids() {
        let t = thesaurus();
        assert_eq!(t.translate("Ph"), Translation::Known("BCR-ABL1".into()));
        assert_eq!(t.translate("  Ph-like "), Translation::Known("BCR-ABL1-like".into()));
        // canonical ids translate to themselves
        for id in t.all_subtypes(true) {
            assert_eq!(t.translate(id), Translation::Known(id.to_string()));
        }
    }

    #[test]
    fn test_translate_is_total() {
        let t = thesaurus();
        assert_eq!(t.translate(""), Translation::Unrecognized(String::new()));
        let unknown = t.translate(" Mystery ");
        assert_eq!(unknown.to_string(), "UNRECOGNIZED_SUBTYPE: Mystery");
        assert!(!t.is_known(&unknown.to_string()));
    }

    #[test]
    fn test_translate_list_and_column() {
        let t = thesaurus();
        assert_eq!(t.translate_list("Ph,Hyperdiploid"), "BCR-ABL1,HYPERDIPLOID");
        assert_eq!(t.translate_list("Ph, Foo"), "BCR-ABL1,UNRECOGNIZED_SUBTYPE: Foo");
        assert_eq!(
            t.translate_column(&["Ph".into(), "T-ALL".into()]),
            vec!["BCR-ABL1".to_string(), "T-ALL".to_string()]
        );
    }

    #[test]
    fn test_is_known_ignores_aliases() {
        let t = thesaurus();
        assert!(t.is_known("BCR-ABL1"));
        assert!(!t.is_known("Ph"));
    }

    #[test]
    fn test_all_subtypes_groups() {
        let t = thesaurus();
        assert_eq!(t.all_subtypes(true).len(), 6);
        let leaves = t.all_subtypes(false);
        assert!(!leaves.contains(&"Ph-group"));
        assert!(leaves.contains(&"BCR-ABL1"));
        assert_eq!(leaves.len(), 5);
    }

    #[test]
    fn test_conflicting_alias_rejected() {
        let yaml = "subtypes:\n  - id: A\n    aliases: [x]\n  - id: B\n    aliases: [x]\n";
        assert!(matches!(
            SubtypeThesaurus::from_yaml_str(yaml),
            Err(PreproError::InvalidSubtypeTable { .. })
        ));
        assert!(SubtypeThesaurus::from_yaml_str("subtypes: 3").is_err());
    }

    #[test]
    fn test_builtin_table_loads() {
        let t = SubtypeThesaurus::builtin().unwrap();
        for id in ["B-other", "T-ALL", "BCR-ABL1", "HYPERDIPLOID"] {
            assert!(t.is_known(id), "{} missing from built-in table", id);
        }
        assert_eq!(t.translate("Ph"), Translation::Known("BCR-ABL1".into()));
    }
}
