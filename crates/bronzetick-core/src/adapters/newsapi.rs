use std::sync::Arc;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::data_source::{NewsQuery, NewsSource, SourceError, SourceFuture};
use crate::domain::format_date;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{NewsArticle, UtcDateTime};

pub const DEFAULT_NEWSAPI_BASE_URL: &str = "https://newsapi.org";
pub const DEFAULT_NEWS_DOMAINS: [&str; 4] =
    ["bloomberg.com", "reuters.com", "cnbc.com", "techcrunch.com"];
const PROVIDER: &str = "newsapi";

/// NewsAPI `everything` search settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub language: String,
    pub page_size: u16,
    pub domains: Vec<String>,
    /// Articles older than today minus this many days are not requested.
    pub lookback_days: u16,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from(DEFAULT_NEWSAPI_BASE_URL),
            language: String::from("en"),
            page_size: 30,
            domains: DEFAULT_NEWS_DOMAINS.iter().map(|d| d.to_string()).collect(),
            lookback_days: 1,
        }
    }
}

/// Company news from NewsAPI.
#[derive(Clone)]
pub struct NewsApiAdapter {
    http_client: Arc<dyn HttpClient>,
    config: NewsApiConfig,
    auth: HttpAuth,
}

impl NewsApiAdapter {
    /// Fails when no API key is configured.
    pub fn new(http_client: Arc<dyn HttpClient>, config: NewsApiConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "NEWS_API_KEY",
            })?;
        Ok(Self {
            http_client,
            config,
            auth: HttpAuth::Header {
                name: String::from("X-Api-Key"),
                value: api_key,
            },
        })
    }

    fn everything_url(&self, query: &NewsQuery) -> String {
        let mut url = format!(
            "{}/v2/everything?q={}&from={}&language={}&sortBy=publishedAt&pageSize={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&query.query),
            format_date(query.from),
            urlencoding::encode(&self.config.language),
            self.config.page_size,
        );
        if !self.config.domains.is_empty() {
            url.push_str("&domains=");
            url.push_str(&urlencoding::encode(&self.config.domains.join(",")));
        }
        url
    }

    async fn fetch_articles(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, SourceError> {
        if query.query.trim().is_empty() {
            return Err(SourceError::invalid_request("news query must not be empty"));
        }

        let request = HttpRequest::get(self.everything_url(query)).with_auth(&self.auth);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::from_transport(PROVIDER, &error))?;

        if !response.is_success() {
            return Err(SourceError::from_status(PROVIDER, &response));
        }

        let payload: NewsApiResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::malformed(format!("failed to parse newsapi response: {e}")))?;

        if payload.status != "ok" {
            return Err(SourceError::upstream(format!(
                "newsapi error {}: {}",
                payload.code.as_deref().unwrap_or("unknown"),
                payload.message.as_deref().unwrap_or("no message")
            )));
        }

        let articles = payload
            .articles
            .into_iter()
            .filter_map(|article| {
                let title = article.title.filter(|title| !title.trim().is_empty())?;
                let published_at = UtcDateTime::parse(article.published_at.as_deref()?).ok()?;
                Some(NewsArticle {
                    company: query.company.clone(),
                    title,
                    description: article.description,
                    url: article.url,
                    published_at,
                })
            })
            .collect();

        Ok(articles)
    }
}

impl NewsSource for NewsApiAdapter {
    fn articles<'a>(&'a self, query: &'a NewsQuery) -> SourceFuture<'a, Vec<NewsArticle>> {
        Box::pin(async move { self.fetch_articles(query).await })
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};
    use crate::Company;
    use time::macros::date;

    fn config() -> NewsApiConfig {
        NewsApiConfig {
            api_key: Some(String::from("news-key")),
            ..NewsApiConfig::default()
        }
    }

    fn query() -> NewsQuery {
        NewsQuery::for_company(Company::parse("Apple").expect("company"), date!(2024 - 01 - 01))
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let client = Arc::new(ScriptedHttpClient::new());
        let result = NewsApiAdapter::new(client, NewsApiConfig::default());
        assert!(matches!(
            result,
            Err(ConfigError::Missing { key: "NEWS_API_KEY" })
        ));
    }

    #[tokio::test]
    async fn sends_search_parameters_and_key_header() {
        let client = Arc::new(ScriptedHttpClient::new().respond(
            "/v2/everything",
            HttpResponse::ok_json(r#"{"status":"ok","totalResults":0,"articles":[]}"#),
        ));
        let adapter = NewsApiAdapter::new(client.clone(), config()).expect("adapter");

        let articles = adapter.articles(&query()).await.expect("articles");
        assert!(articles.is_empty());

        let request = &client.requests()[0];
        assert_eq!(
            request.url,
            "https://newsapi.org/v2/everything?q=Apple&from=2024-01-01&language=en\
             &sortBy=publishedAt&pageSize=30\
             &domains=bloomberg.com%2Creuters.com%2Ccnbc.com%2Ctechcrunch.com"
        );
        assert_eq!(
            request.headers.get("x-api-key").map(String::as_str),
            Some("news-key")
        );
    }

    #[tokio::test]
    async fn keeps_articles_with_title_and_timestamp() {
        let body = r#"{"status":"ok","totalResults":3,"articles":[
            {"title":"Apple rallies","description":"Shares up","url":"https://x.test/1","publishedAt":"2024-01-02T15:04:05Z"},
            {"title":null,"description":"No title","url":"https://x.test/2","publishedAt":"2024-01-02T16:00:00Z"},
            {"title":"Undated","description":null,"url":null,"publishedAt":"yesterday"}]}"#;
        let client =
            Arc::new(ScriptedHttpClient::new().respond("/v2/everything", HttpResponse::ok_json(body)));
        let adapter = NewsApiAdapter::new(client, config()).expect("adapter");

        let articles = adapter.articles(&query()).await.expect("articles");

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Apple rallies");
        assert_eq!(articles[0].company.as_str(), "Apple");
        assert_eq!(articles[0].published_at.format_rfc3339(), "2024-01-02T15:04:05Z");
    }

    #[tokio::test]
    async fn maps_provider_failures() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .respond("/v2/everything", HttpResponse::new(401, r#"{"status":"error"}"#))
                .respond("/v2/everything", HttpResponse::new(429, r#"{"status":"error"}"#))
                .respond(
                    "/v2/everything",
                    HttpResponse::ok_json(
                        r#"{"status":"error","code":"parameterInvalid","message":"bad from"}"#,
                    ),
                ),
        );
        let adapter = NewsApiAdapter::new(client, config()).expect("adapter");

        let first = adapter.articles(&query()).await.expect_err("401");
        let second = adapter.articles(&query()).await.expect_err("429");
        let third = adapter.articles(&query()).await.expect_err("status error");

        assert_eq!(first.kind(), SourceErrorKind::Unauthorized);
        assert_eq!(second.kind(), SourceErrorKind::RateLimited);
        assert_eq!(third.kind(), SourceErrorKind::Upstream);
        assert!(third.message().contains("parameterInvalid"));
    }
}
