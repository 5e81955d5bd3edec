use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Undertone;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub brand: String,
    pub name: String,
    pub shade: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub summary: String,
    pub products: Vec<Product>,
}

/// One row of the recommendations file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub undertone: Undertone,
    pub tone_label: String,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("failed to read recommendations file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse recommendations file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate recommendation for {undertone}/{tone_label}")]
    Duplicate {
        undertone: Undertone,
        tone_label: String,
    },
}

/// Lookup from (undertone, tone label) to a product recommendation.
#[derive(Debug, Default)]
pub struct RecommendationTable {
    entries: HashMap<(Undertone, String), Recommendation>,
}

impl RecommendationTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecommendationError> {
        let raw = fs::read_to_string(path)?;
        let entries: Vec<RecommendationEntry> = serde_json::from_str(&raw)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = RecommendationEntry>,
    ) -> Result<Self, RecommendationError> {
        let mut table = HashMap::new();
        for entry in entries {
            let key = (entry.undertone, entry.tone_label);
            if table.contains_key(&key) {
                return Err(RecommendationError::Duplicate {
                    undertone: key.0,
                    tone_label: key.1,
                });
            }
            table.insert(key, entry.recommendation);
        }
        Ok(Self { entries: table })
    }

    pub fn get_recommendation(
        &self,
        undertone: Undertone,
        tone_label: &str,
    ) -> Option<&Recommendation> {
        self.entries.get(&(undertone, tone_label.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(undertone: Undertone, tone_label: &str) -> RecommendationEntry {
        RecommendationEntry {
            undertone,
            tone_label: tone_label.to_string(),
            recommendation: Recommendation {
                summary: format!("{undertone} {tone_label}"),
                products: vec![Product {
                    brand: "Acme".into(),
                    name: "Skin Tint".into(),
                    shade: "W3".into(),
                    category: None,
                }],
            },
        }
    }

    #[test]
    fn looks_up_by_undertone_and_tone() {
        let table = RecommendationTable::from_entries([
            entry(Undertone::Warm, "medium"),
            entry(Undertone::Cool, "medium"),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        let found = table.get_recommendation(Undertone::Warm, "medium").unwrap();
        assert_eq!(found.summary, "warm medium");
        assert!(table.get_recommendation(Undertone::Neutral, "medium").is_none());
        assert!(table.get_recommendation(Undertone::Warm, "fair").is_none());
    }

    #[test]
    fn duplicate_pairs_are_rejected() {
        let err = RecommendationTable::from_entries([
            entry(Undertone::Warm, "deep"),
            entry(Undertone::Warm, "deep"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "duplicate recommendation for warm/deep");
    }

    #[test]
    fn loads_flattened_entries_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendations.json");
        fs::write(
            &path,
            r#"[{"undertone":"neutral","tone_label":"fair","summary":"Sheer neutral base",
                 "products":[{"brand":"Acme","name":"Serum Foundation","shade":"N1","category":"foundation"}]}]"#,
        )
        .unwrap();

        let table = RecommendationTable::load(&path).unwrap();
        let found = table.get_recommendation(Undertone::Neutral, "fair").unwrap();
        assert_eq!(found.products[0].category.as_deref(), Some("foundation"));
    }

    #[test]
    fn shipped_table_covers_every_pair() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/recommendations.json");
        let table = RecommendationTable::load(path).unwrap();
        for undertone in [Undertone::Warm, Undertone::Cool, Undertone::Neutral] {
            for label in crate::palette::DEFAULT_TONE_LABELS {
                assert!(
                    table.get_recommendation(undertone, label).is_some(),
                    "missing {undertone}/{label}"
                );
            }
        }
    }
}
