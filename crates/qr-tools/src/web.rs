//! Web lookup tools: DuckDuckGo search and Wikipedia summaries.
//!
//! Both adapters turn every failure into tool output text so the agent loop
//! always has something to read.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use qr_core::{
    text_argument, Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters,
};

const USER_AGENT: &str = concat!("quick-research/", env!("CARGO_PKG_VERSION"));

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn query_parameters() -> ToolParameters {
    ToolParameters::new().add_property(
        "query",
        PropertySchema::string("A specific search query"),
        true,
    )
}

// =============================================================================
// Search Tool (DuckDuckGo HTML endpoint)
// =============================================================================

pub struct SearchTool {
    client: Client,
    max_results: usize,
}

impl SearchTool {
    pub fn new(timeout: Duration, max_results: usize) -> Self {
        Self {
            client: build_client(timeout),
            max_results: max_results.max(1),
        }
    }

    async fn fetch(&self, query: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(DDG_HTML_URL)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// One organic search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
}

/// Pull organic results out of a DuckDuckGo HTML result page. Ads are skipped.
pub fn parse_search_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter(|el| !el.value().classes().any(|c| c == "result--ad"))
        .filter_map(|el| {
            let title = el
                .select(&title_sel)
                .next()
                .map(|t| collapse_whitespace(&t.text().collect::<String>()))?;
            if title.is_empty() {
                return None;
            }
            let body = el
                .select(&snippet_sel)
                .next()
                .map(|s| collapse_whitespace(&s.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchHit { title, body })
        })
        .take(max_results)
        .collect()
}

fn format_search_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No search results found.".to_string();
    }
    hits.iter()
        .map(|hit| format!("- {}: {}", hit.title, hit.body))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Input should be a specific search query."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(query_parameters())
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let Some(query) = text_argument(&arguments, "query") else {
            return Ok(ToolOutput::error("Invalid arguments: expected a non-empty 'query' string"));
        };

        debug!(query = %query, "Running web search");
        match self.fetch(&query).await {
            Ok(html) => {
                let hits = parse_search_results(&html, self.max_results);
                debug!(results = hits.len(), "Web search complete");
                Ok(ToolOutput::success(format_search_results(&hits)))
            }
            Err(e) => {
                warn!(error = %e, "Web search failed");
                Ok(ToolOutput::error(format!("Search error: {}", e)))
            }
        }
    }
}

// =============================================================================
// Wikipedia Tool (MediaWiki API)
// =============================================================================

pub struct WikipediaTool {
    client: Client,
    api_url: String,
    max_chars: usize,
}

impl WikipediaTool {
    pub fn new(timeout: Duration, lang: &str, max_chars: usize) -> Self {
        Self {
            client: build_client(timeout),
            api_url: format!("https://{}.wikipedia.org/w/api.php", lang),
            max_chars,
        }
    }

    async fn api_get(&self, params: &[(&str, &str)]) -> Result<Value, reqwest::Error> {
        self.client
            .get(&self.api_url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn lookup(&self, query: &str) -> Result<Option<(String, String)>, reqwest::Error> {
        let search = self
            .api_get(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "search"),
                ("srlimit", "1"),
                ("srsearch", query),
            ])
            .await?;

        let Some(title) = top_search_title(&search) else {
            return Ok(None);
        };

        let page = self
            .api_get(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title.as_str()),
            ])
            .await?;

        Ok(page_extract(&page).map(|extract| (title, extract)))
    }
}

fn top_search_title(search: &Value) -> Option<String> {
    search["query"]["search"]
        .as_array()?
        .first()?
        .get("title")?
        .as_str()
        .map(str::to_string)
}

fn page_extract(page: &Value) -> Option<String> {
    page["query"]["pages"]
        .as_object()?
        .values()
        .find_map(|p| p.get("extract").and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn format_wikipedia_page(title: &str, extract: &str, max_chars: usize) -> String {
    let text = format!("Page: {}\nSummary: {}", title, extract);
    truncate_chars(&text, max_chars)
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up a topic on Wikipedia. Useful for general questions about people, places, \
         events, facts and concepts. Input should be a search query."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(query_parameters())
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let Some(query) = text_argument(&arguments, "query") else {
            return Ok(ToolOutput::error("Invalid arguments: expected a non-empty 'query' string"));
        };

        debug!(query = %query, "Looking up Wikipedia");
        match self.lookup(&query).await {
            Ok(Some((title, extract))) => Ok(ToolOutput::success(format_wikipedia_page(
                &title,
                &extract,
                self.max_chars,
            ))),
            Ok(None) => Ok(ToolOutput::success("No good Wikipedia Search Result was found")),
            Err(e) => {
                warn!(error = %e, "Wikipedia lookup failed");
                Ok(ToolOutput::error(format!("Wikipedia error: {}", e)))
            }
        }
    }
}

// =============================================================================
// Text helpers
// =============================================================================

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_PAGE: &str = r#"
        <html><body>
          <div class="result results_links result--ad">
            <a class="result__a" href="https://ads.example">Sponsored</a>
            <a class="result__snippet">Buy now</a>
          </div>
          <div class="result results_links">
            <h2><a class="result__a" href="https://a.example">Photosynthesis   - Wikipedia</a></h2>
            <a class="result__snippet">Photosynthesis is a process used by <b>plants</b>.</a>
          </div>
          <div class="result results_links">
            <h2><a class="result__a" href="https://b.example">Light reactions</a></h2>
          </div>
          <div class="result results_links">
            <h2><a class="result__a" href="https://c.example">Calvin cycle</a></h2>
            <a class="result__snippet">Carbon fixation.</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_search_results_skips_ads() {
        let hits = parse_search_results(DDG_PAGE, 5);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Photosynthesis - Wikipedia");
        assert_eq!(hits[0].body, "Photosynthesis is a process used by plants.");
        assert_eq!(hits[1].body, "");
    }

    #[test]
    fn test_parse_search_results_respects_limit() {
        let hits = parse_search_results(DDG_PAGE, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_format_search_results() {
        let hits = vec![SearchHit {
            title: "Calvin cycle".to_string(),
            body: "Carbon fixation.".to_string(),
        }];
        assert_eq!(format_search_results(&hits), "- Calvin cycle: Carbon fixation.");
        assert_eq!(format_search_results(&[]), "No search results found.");
    }

    #[test]
    fn test_wikipedia_response_extraction() {
        let search = serde_json::json!({
            "query": {"search": [{"title": "Photosynthesis", "pageid": 24544}]}
        });
        assert_eq!(top_search_title(&search).as_deref(), Some("Photosynthesis"));
        assert_eq!(top_search_title(&serde_json::json!({"query": {"search": []}})), None);

        let page = serde_json::json!({
            "query": {"pages": {"24544": {"title": "Photosynthesis", "extract": "  Photosynthesis is...  "}}}
        });
        assert_eq!(page_extract(&page).as_deref(), Some("Photosynthesis is..."));
        let missing = serde_json::json!({"query": {"pages": {"-1": {"missing": ""}}}});
        assert_eq!(page_extract(&missing), None);
    }

    #[test]
    fn test_format_wikipedia_page_truncates() {
        let text = format_wikipedia_page("Photosynthesis", &"x".repeat(5000), 100);
        assert!(text.starts_with("Page: Photosynthesis\nSummary: "));
        assert_eq!(text.chars().count(), 100);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[tokio::test]
    async fn test_search_rejects_missing_query() {
        let tool = SearchTool::new(Duration::from_secs(1), 5);
        let output = tool.execute(serde_json::json!({"q": "x"})).await.unwrap();
        assert!(output.is_error);
        assert!(output.content.contains("query"));
    }

    #[test]
    fn test_tool_definitions() {
        let search = SearchTool::new(Duration::from_secs(1), 5);
        let wiki = WikipediaTool::new(Duration::from_secs(1), "en", 1000);
        assert_eq!(search.definition().name, "search");
        assert_eq!(wiki.definition().name, "wikipedia");
        assert_eq!(wiki.api_url, "https://en.wikipedia.org/w/api.php");
        assert!(search.definition().parameters.required.contains(&"query".to_string()));
    }
}
