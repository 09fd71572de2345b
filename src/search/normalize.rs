//! Mapping of scraped articles to [`SearchResultItem`].

use super::relevance;
use super::source::RawArticle;
use crate::types::{Author, SearchResultItem};
use chrono::{DateTime, NaiveDateTime};
use sha2::{Digest, Sha256};

const ABS_MARKER: &str = "arxiv.org/abs/";

/// Normalize one scraped article, scoring it against `query`.
pub fn normalize(raw: RawArticle, query: &str) -> SearchResultItem {
    let title = raw.title.trim().to_string();
    let abstract_text = raw.summary.trim().to_string();

    let mut categories: Vec<String> = raw
        .main_topics
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if categories.is_empty() {
        categories = default_topics(query);
    }

    let url = raw.link.trim().to_string();
    let relevance = relevance::score(query, &title, &abstract_text);

    SearchResultItem {
        id: article_id(&url, &title),
        authors: split_authors(&raw.authors),
        published: raw.published.as_deref().and_then(format_published),
        primary_category: categories.first().cloned().unwrap_or_default(),
        categories,
        pdf_url: pdf_url(&url),
        url,
        source: "ArXiv".to_string(),
        relevance,
        title,
        abstract_text,
        extra: raw.extra,
    }
}

/// The first three query words, used when a source reports no topics.
pub fn default_topics(query: &str) -> Vec<String> {
    query.split_whitespace().take(3).map(str::to_string).collect()
}

pub fn split_authors(authors: &str) -> Vec<Author> {
    authors
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|name| Author {
            name: name.to_string(),
        })
        .collect()
}

/// `arxiv-arxiv:<id>` for abstract links, otherwise `arxiv-` plus a title hash.
pub fn article_id(url: &str, title: &str) -> String {
    let abs_id = url.find(ABS_MARKER).and_then(|pos| {
        let rest = &url[pos + ABS_MARKER.len()..];
        let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
        (!id.is_empty()).then_some(id)
    });

    match abs_id {
        Some(id) => format!("arxiv-arxiv:{id}"),
        None => {
            let digest = Sha256::digest(title.as_bytes());
            format!("arxiv-{}", &hex::encode(digest)[..16])
        }
    }
}

pub fn pdf_url(url: &str) -> String {
    if url.is_empty() || url == "#" {
        return String::new();
    }
    format!("{}.pdf", url.replace("/abs/", "/pdf/"))
}

/// Reformat timestamps to `YYYY-MM-DD`; other values pass through unchanged.
pub fn format_published(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    Some(value.to_string())
}
