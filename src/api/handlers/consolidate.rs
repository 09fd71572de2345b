use crate::consolidate::{ArticleRef, ConsolidatedArtifact, RelationResult, assemble, congruence};
use crate::types::{AppError, Result, StructuredResult};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidateDocument {
    pub article: ArticleRef,
    #[serde(default)]
    pub result: StructuredResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidateRequest {
    pub documents: Vec<ConsolidateDocument>,
    /// Precomputed relation; takes precedence over `compute_relation`.
    #[serde(default)]
    pub relation: Option<RelationResult>,
    #[serde(default = "default_compute_relation")]
    pub compute_relation: bool,
}

fn default_compute_relation() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidateResponse {
    pub artifact: ConsolidatedArtifact,
    pub markdown: String,
}

/// POST /consolidate
pub async fn consolidate(Json(request): Json<ConsolidateRequest>) -> Result<Json<ConsolidateResponse>> {
    if request.documents.is_empty() {
        return Err(AppError::InvalidInput("At least one document is required".to_string()));
    }

    let relation = match request.relation {
        Some(relation) => Some(relation),
        None if request.compute_relation => {
            let keyed: Vec<(String, &StructuredResult)> = request
                .documents
                .iter()
                .map(|d| {
                    let id = d.article.id.clone().unwrap_or_else(|| d.article.title.clone());
                    (id, &d.result)
                })
                .collect();
            Some(congruence(&keyed))
        }
        None => None,
    };

    let pairs = request
        .documents
        .into_iter()
        .map(|d| (d.article, d.result))
        .collect();
    let artifact = assemble(pairs, relation);
    let markdown = artifact.to_markdown();

    Ok(Json(ConsolidateResponse { artifact, markdown }))
}
