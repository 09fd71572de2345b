//! Query relevance scoring.

/// Weight of a query term found in the title.
pub const TITLE_WEIGHT: f64 = 0.7;
/// Weight of a query term found in the abstract.
pub const ABSTRACT_WEIGHT: f64 = 0.3;

/// Score how well an article matches `query`, in `[0, 1]`.
///
/// Each lowercase whitespace-separated query term counts once if it occurs
/// (as a substring) in the lowercased title and once if it occurs in the
/// lowercased abstract. The weighted sum is normalized by the score of a
/// title containing every term, capped at `1.0`, and rounded to two decimals.
pub fn score(query: &str, title: &str, abstract_text: &str) -> f64 {
    let query = query.to_lowercase();
    let terms: Vec<&str> = query.split_whitespace().collect();
    let max_possible = terms.len() as f64 * TITLE_WEIGHT;
    if max_possible <= 0.0 {
        return 0.0;
    }

    let title = title.to_lowercase();
    let abstract_text = abstract_text.to_lowercase();

    let title_hits = terms.iter().filter(|t| title.contains(*t)).count() as f64;
    let abstract_hits = terms.iter().filter(|t| abstract_text.contains(*t)).count() as f64;

    let raw = title_hits * TITLE_WEIGHT + abstract_hits * ABSTRACT_WEIGHT;
    round2((raw / max_possible).min(1.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
