use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{Encyclopedia, EncyclopediaEntry, EncyclopediaError};
use crate::config::{AssistantConfig, APP_NAME, APP_VERSION};

/// Options listed for an ambiguous topic.
pub const DISAMBIGUATION_LIMIT: usize = 3;

/// Wikipedia REST client (page summaries + opensearch for ambiguous titles).
pub struct WikipediaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl WikipediaClient {
    /// Client for `https://{lang}.wikipedia.org`.
    pub fn new(lang: &str, timeout_secs: u64) -> Result<Self, EncyclopediaError> {
        Self::with_base_url(&format!("https://{lang}.wikipedia.org"), timeout_secs)
    }

    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, EncyclopediaError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
            .build()
            .map_err(|e| EncyclopediaError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self, EncyclopediaError> {
        Self::new(&config.wiki_lang, config.wiki_timeout_secs)
    }

    fn summary_url(&self, topic: &str) -> Result<reqwest::Url, EncyclopediaError> {
        let mut url = reqwest::Url::parse(&format!("{}/api/rest_v1/page/summary/", self.base_url))
            .map_err(|e| EncyclopediaError::HttpClient(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| EncyclopediaError::HttpClient(format!("cannot-be-a-base URL: {}", self.base_url)))?
            .pop_if_empty()
            .push(&article_title(topic));
        Ok(url)
    }

    fn disambiguation_options(&self, topic: &str) -> Result<Vec<String>, EncyclopediaError> {
        let url = format!("{}/w/api.php", self.base_url);
        let limit = DISAMBIGUATION_LIMIT.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("action", "opensearch"),
                ("search", topic),
                ("limit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(EncyclopediaError::Status {
                status: response.status().as_u16(),
            });
        }

        // opensearch answers [query, [titles], [descriptions], [urls]]
        let body: serde_json::Value = response
            .json()
            .map_err(|e| EncyclopediaError::ResponseParsing(e.to_string()))?;
        Ok(parse_opensearch_titles(&body))
    }

    fn map_send_error(&self, e: reqwest::Error) -> EncyclopediaError {
        if e.is_timeout() {
            EncyclopediaError::Connection(format!("timed out after {}s", self.timeout_secs))
        } else if e.is_connect() {
            EncyclopediaError::Connection(self.base_url.clone())
        } else {
            EncyclopediaError::HttpClient(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    extract: String,
}

impl Encyclopedia for WikipediaClient {
    fn summary(&self, topic: &str) -> Result<Option<EncyclopediaEntry>, EncyclopediaError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Ok(None);
        }

        let url = self.summary_url(topic)?;
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(EncyclopediaError::Status {
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let page: PageSummary = response
            .json()
            .map_err(|e| EncyclopediaError::ResponseParsing(e.to_string()))?;

        if page.kind == "disambiguation" {
            let options = self.disambiguation_options(topic)?;
            tracing::debug!(topic, options = options.len(), "Ambiguous encyclopedia topic");
            return Ok(Some(EncyclopediaEntry::Disambiguation(options)));
        }

        if page.extract.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(EncyclopediaEntry::Summary(page.extract)))
    }
}

/// Article title as used in REST paths: first letter upper-cased, spaces as underscores.
fn article_title(topic: &str) -> String {
    let mut chars = topic.trim().chars();
    let title = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    title.replace(' ', "_")
}

fn parse_opensearch_titles(body: &serde_json::Value) -> Vec<String> {
    body.get(1)
        .and_then(|titles| titles.as_array())
        .map(|titles| {
            titles
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .take(DISAMBIGUATION_LIMIT)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_uses_language_subdomain() {
        let client = WikipediaClient::new("es", 10).unwrap();
        assert_eq!(client.base_url, "https://es.wikipedia.org");
    }

    #[test]
    fn summary_url_encodes_title() {
        let client = WikipediaClient::new("es", 10).unwrap();
        let url = client.summary_url("gripe aviar").unwrap();
        assert_eq!(
            url.as_str(),
            "https://es.wikipedia.org/api/rest_v1/page/summary/Gripe_aviar"
        );
    }

    #[test]
    fn summary_url_percent_encodes_accents() {
        let client = WikipediaClient::new("es", 10).unwrap();
        let url = client.summary_url("migraña").unwrap();
        assert!(url.as_str().ends_with("/summary/Migra%C3%B1a"));
    }

    #[test]
    fn article_title_capitalizes_first_letter() {
        assert_eq!(article_title("  faringitis "), "Faringitis");
        assert_eq!(article_title("dolor de cabeza"), "Dolor_de_cabeza");
        assert_eq!(article_title(""), "");
    }

    #[test]
    fn opensearch_titles_are_capped() {
        let body = serde_json::json!([
            "gripe",
            ["Gripe", "Gripe aviar", "Gripe porcina", "Gripe española"],
            [],
            []
        ]);
        assert_eq!(
            parse_opensearch_titles(&body),
            vec!["Gripe", "Gripe aviar", "Gripe porcina"]
        );
    }

    #[test]
    fn malformed_opensearch_body_yields_no_options() {
        assert!(parse_opensearch_titles(&serde_json::json!({"error": "x"})).is_empty());
    }

    #[test]
    fn empty_topic_is_not_looked_up() {
        let client = WikipediaClient::with_base_url("http://127.0.0.1:9", 1).unwrap();
        assert_eq!(client.summary("   ").unwrap(), None);
    }
}
