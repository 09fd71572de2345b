//! Cross-document congruence.
//!
//! Two documents are congruent when they share at least one main idea,
//! compared as exact strings.

use crate::types::StructuredResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairRelation {
    pub first: String,
    pub second: String,
    pub congruent: bool,
    pub shared_main_ideas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationResult {
    pub conclusion: String,
    pub details: String,
    pub pairs: Vec<PairRelation>,
}

/// Compare every unordered pair of `(document id, result)` entries.
pub fn congruence(documents: &[(String, &StructuredResult)]) -> RelationResult {
    let mut pairs = Vec::new();
    for (i, (first_id, first)) in documents.iter().enumerate() {
        for (second_id, second) in &documents[i + 1..] {
            let mut seen = HashSet::new();
            let shared: Vec<String> = first
                .main_ideas
                .iter()
                .filter(|idea| second.main_ideas.contains(idea) && seen.insert(idea.as_str()))
                .cloned()
                .collect();

            pairs.push(PairRelation {
                first: first_id.clone(),
                second: second_id.clone(),
                congruent: !shared.is_empty(),
                shared_main_ideas: shared,
            });
        }
    }

    let congruent: Vec<&PairRelation> = pairs.iter().filter(|p| p.congruent).collect();
    let conclusion = if pairs.is_empty() {
        "Not enough documents to compare".to_string()
    } else if congruent.is_empty() {
        "No relation found".to_string()
    } else {
        format!(
            "{} of {} document pairs share main ideas",
            congruent.len(),
            pairs.len()
        )
    };

    let details = congruent
        .iter()
        .map(|p| format!("{} / {}: {}", p.first, p.second, p.shared_main_ideas.join(", ")))
        .collect::<Vec<_>>()
        .join("; ");

    RelationResult {
        conclusion,
        details,
        pairs,
    }
}
