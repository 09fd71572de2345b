//! ArXiv search-page adapter.
//!
//! Queries the public HTML search at `{base_url}/search/` and scrapes the
//! result list. Results are normalized and scored before being returned.

use super::normalize::{self, default_topics};
use super::source::{RawArticle, SearchSource};
use crate::types::{AppError, Result, SearchQuery, SearchResultItem};
use crate::utils::toml_config::SearchConfig;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Page sizes the search page accepts.
const PAGE_SIZES: [usize; 4] = [25, 50, 100, 200];

pub struct ArxivSource {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivSource {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Self::new(&config.arxiv_base_url, &config.user_agent, config.timeout())
    }

    fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let size = PAGE_SIZES
            .iter()
            .copied()
            .find(|s| *s >= query.max_results)
            .unwrap_or(PAGE_SIZES[PAGE_SIZES.len() - 1]);

        let order = match (query.sortby.as_str(), query.sortorder.as_str()) {
            ("relevance", _) => "",
            ("submittedDate" | "date", "ascending") => "submitted_date",
            ("submittedDate" | "date", _) => "-submitted_date",
            ("lastUpdatedDate" | "announced", "ascending") => "announced_date_first",
            ("lastUpdatedDate" | "announced", _) => "-announced_date_first",
            _ => "",
        };

        vec![
            ("query", query.query.clone()),
            ("searchtype", query.type_query.clone()),
            ("abstracts", "show".to_string()),
            ("size", size.to_string()),
            ("start", query.start.to_string()),
            ("order", order.to_string()),
        ]
    }
}

#[async_trait]
impl SearchSource for ArxivSource {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        let url = format!("{}/search/", self.base_url);
        tracing::debug!(%url, query = %query.query, "fetching arxiv search page");

        let response = self
            .client
            .get(&url)
            .query(&Self::search_params(query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Connectivity(format!(
                "ArXiv search returned status {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        let articles = parse_results(&html, &self.base_url, query.max_results)?;

        Ok(articles
            .into_iter()
            .map(|mut raw| {
                if raw.main_topics.is_empty() {
                    raw.main_topics = default_topics(&query.query);
                }
                normalize::normalize(raw, &query.query)
            })
            .collect())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Internal(format!("Invalid selector {css}: {e}")))
}

fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(element: ElementRef<'_>, sel: &Selector) -> Option<String> {
    element.select(sel).next().map(clean_text).filter(|t| !t.is_empty())
}

/// Scrape up to `max_results` articles from a search results page.
pub fn parse_results(html: &str, base_url: &str, max_results: usize) -> Result<Vec<RawArticle>> {
    let document = Html::parse_document(html);

    let result_sel = selector("li.arxiv-result")?;
    let title_sel = selector("p.title")?;
    let authors_sel = selector("p.authors")?;
    let abstract_full_sel = selector("span.abstract-full")?;
    let abstract_sel = selector("p.abstract")?;
    let link_sel = selector("p.list-title a")?;
    let tag_sel = selector("div.tags span.tag")?;
    let submitted_sel = selector("p.is-size-7")?;

    let mut articles = Vec::new();
    for element in document.select(&result_sel).take(max_results) {
        let authors = first_text(element, &authors_sel).unwrap_or_default();
        let summary = first_text(element, &abstract_full_sel)
            .or_else(|| first_text(element, &abstract_sel))
            .unwrap_or_default();

        let link = element
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| {
                if href.starts_with("http") {
                    href.to_string()
                } else {
                    format!("{base_url}{href}")
                }
            })
            .unwrap_or_default();

        let published = element
            .select(&submitted_sel)
            .map(clean_text)
            .find_map(|t| submitted_date(&t));

        articles.push(RawArticle {
            title: first_text(element, &title_sel).unwrap_or_else(|| "Untitled".to_string()),
            authors: authors.trim_start_matches("Authors:").trim().to_string(),
            summary: strip_abstract_chrome(&summary),
            link,
            published,
            main_topics: element.select(&tag_sel).map(clean_text).collect(),
            extra: Default::default(),
        });
    }

    Ok(articles)
}

fn strip_abstract_chrome(text: &str) -> String {
    text.trim_start_matches("Abstract:")
        .trim()
        .trim_end_matches("Less")
        .trim_end()
        .trim_end_matches('△')
        .trim()
        .to_string()
}

/// `"Submitted 31 January, 2024; originally announced ..."` -> `"31 January, 2024"`.
fn submitted_date(text: &str) -> Option<String> {
    let rest = text.strip_prefix("Submitted")?;
    let date = rest.split(';').next()?.trim();
    (!date.is_empty()).then(|| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
<html><body><ol>
<li class="arxiv-result">
  <div class="is-marginless">
    <p class="list-title is-inline-block"><a href="https://arxiv.org/abs/2401.18059">arXiv:2401.18059</a></p>
    <div class="tags is-inline-block">
      <span class="tag is-small is-link">cs.CL</span>
      <span class="tag is-small is-grey">cs.LG</span>
    </div>
  </div>
  <p class="title is-5 mathjax">
    RAPTOR: Recursive Abstractive Processing for Tree-Organized Retrieval
  </p>
  <p class="authors"><span class="search-hit">Authors:</span>
    <a href="#">Parth Sarthi</a>, <a href="#">Salman Abdullah</a>
  </p>
  <p class="abstract mathjax">
    <span class="search-hit">Abstract</span>:
    <span class="abstract-short">Retrieval-augmented models...</span>
    <span class="abstract-full">Retrieval-augmented language models can better adapt. <a>&#9651; Less</a></span>
  </p>
  <p class="is-size-7"><span>Submitted</span> 31 January, 2024; <span>originally announced</span> January 2024.</p>
</li>
<li class="arxiv-result">
  <p class="list-title"><a href="/abs/2312.00001">arXiv:2312.00001</a></p>
  <p class="title">Second paper</p>
</li>
</ol></body></html>
"##;

    #[test]
    fn test_parse_results_page() {
        let articles = parse_results(PAGE, "https://arxiv.org", 10).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(
            first.title,
            "RAPTOR: Recursive Abstractive Processing for Tree-Organized Retrieval"
        );
        assert_eq!(first.authors, "Parth Sarthi, Salman Abdullah");
        assert_eq!(first.summary, "Retrieval-augmented language models can better adapt.");
        assert_eq!(first.link, "https://arxiv.org/abs/2401.18059");
        assert_eq!(first.main_topics, vec!["cs.CL", "cs.LG"]);
        assert_eq!(first.published.as_deref(), Some("31 January, 2024"));

        let second = &articles[1];
        assert_eq!(second.link, "https://arxiv.org/abs/2312.00001");
        assert!(second.summary.is_empty());
        assert!(second.main_topics.is_empty());
    }

    #[test]
    fn test_parse_results_respects_max() {
        let articles = parse_results(PAGE, "https://arxiv.org", 1).unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn test_search_params() {
        let mut q = SearchQuery::new("tree retrieval");
        q.max_results = 30;
        q.sortby = "date".into();
        let params = ArxivSource::search_params(&q);
        assert!(params.contains(&("size", "50".to_string())));
        assert!(params.contains(&("order", "-submitted_date".to_string())));
        assert!(params.contains(&("searchtype", "all".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_normalizes_results() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("query", "RAPTOR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let source = ArxivSource::new(server.uri(), "test-agent", Duration::from_secs(5)).unwrap();
        let items = source.fetch(&SearchQuery::new("RAPTOR")).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, "ArXiv");
        assert_eq!(items[0].authors.len(), 2);
        assert!(items[0].relevance > 0.0);
        // No tags on the page: categories come from the query words.
        assert_eq!(items[1].categories, vec!["RAPTOR"]);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_connectivity() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = ArxivSource::new(server.uri(), "test-agent", Duration::from_secs(5)).unwrap();
        let err = source.fetch(&SearchQuery::new("q")).await.unwrap_err();
        assert!(matches!(err, AppError::Connectivity(_)));
    }
}
