//! Consolidation of several documents' structured results into one artifact.

/// Cross-document congruence relation.
pub mod relation;

pub use relation::{PairRelation, RelationResult, congruence};

use crate::types::StructuredResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key dropped from every section, compared case-insensitively.
pub const CHAIN_OF_THOUGHT_KEY: &str = "chain_of_thought";

/// The article a structured result belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArticleRef {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    /// Code or README text from the article's repository, if one was found.
    #[serde(default)]
    pub repository_excerpt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionField {
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSection {
    pub title: String,
    pub fields: Vec<SectionField>,
    pub repository_excerpt: Option<String>,
}

/// Cross-document relation, or an explicit marker that none was computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelationSummary {
    Computed(RelationResult),
    NotComputed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsolidatedArtifact {
    pub sections: Vec<DocumentSection>,
    pub relation_summary: RelationSummary,
}

/// Merge `(article, result)` pairs, in input order, with an optional relation.
pub fn assemble(
    pairs: Vec<(ArticleRef, StructuredResult)>,
    relation: Option<RelationResult>,
) -> ConsolidatedArtifact {
    let sections = pairs
        .into_iter()
        .map(|(article, result)| DocumentSection {
            title: article.title,
            fields: flatten(result),
            repository_excerpt: article.repository_excerpt.filter(|e| !e.trim().is_empty()),
        })
        .collect();

    ConsolidatedArtifact {
        sections,
        relation_summary: relation.map_or(RelationSummary::NotComputed, RelationSummary::Computed),
    }
}

fn flatten(result: StructuredResult) -> Vec<SectionField> {
    let StructuredResult {
        main_ideas,
        methods,
        comparisons,
        algorithms,
        other,
        error,
        extra,
    } = result;

    let mut fields: Vec<SectionField> = [
        ("main_ideas", main_ideas),
        ("methods", methods),
        ("comparisons", comparisons),
        ("algorithms", algorithms),
        ("other", other),
    ]
    .into_iter()
    .map(|(key, values)| SectionField {
        key: key.to_string(),
        values,
    })
    .collect();

    if let Some(error) = error {
        fields.push(SectionField {
            key: "error".to_string(),
            values: vec![error],
        });
    }

    fields.extend(
        extra
            .into_iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(CHAIN_OF_THOUGHT_KEY))
            .map(|(key, value)| SectionField {
                key,
                values: value_strings(value),
            }),
    );
    fields
}

fn value_strings(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl ConsolidatedArtifact {
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("### Consolidated Material\n\n");

        match &self.relation_summary {
            RelationSummary::Computed(relation) => {
                out.push_str(&format!("**Congruence Conclusion:** {}\n\n", relation.conclusion));
                out.push_str(&format!("**Details:** {}\n\n", relation.details));
            }
            RelationSummary::NotComputed => {
                out.push_str("**Congruence Conclusion:** No relation computed\n\n");
            }
        }

        for section in &self.sections {
            out.push_str(&format!("## {}\n\n", section.title));
            for field in &section.fields {
                out.push_str(&format!(
                    "**{}:** {}\n\n",
                    capitalize(&field.key),
                    field.values.join(", ")
                ));
            }
            if let Some(excerpt) = &section.repository_excerpt {
                out.push_str(&format!("**Repository:**\n\n```\n{}\n```\n\n", excerpt.trim_end()));
            }
        }

        out
    }
}
