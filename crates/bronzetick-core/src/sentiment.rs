//! Headline sentiment classification through an OpenAI-compatible chat
//! completions endpoint.
//!
//! The label vocabulary and the prompt are configuration. The model's reply is
//! normalized and must name exactly one configured label.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ConfigError;
use crate::data_source::{SourceError, SourceFuture};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::ValidationError;

pub const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_FALLBACK_LABEL: &str = "neutral";
pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "Is the following news headline {labels}? Headline: {headline}. Only answer with {quoted_labels}.";
const PROVIDER: &str = "classifier";

/// One classification outcome, always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentimentLabel(String);

impl SentimentLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SentimentLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, distinct set of single-word labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::three_way()
    }
}

impl LabelSet {
    pub fn three_way() -> Self {
        Self {
            labels: vec![
                String::from("good"),
                String::from("bad"),
                String::from("neutral"),
            ],
        }
    }

    pub fn two_way() -> Self {
        Self {
            labels: vec![String::from("good"), String::from("bad")],
        }
    }

    /// Parse a comma separated list such as `good,bad,neutral`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidLabelSet {
            value: input.to_string(),
        };

        let mut labels: Vec<String> = Vec::new();
        for raw in input.split(',') {
            let label = raw.trim().to_ascii_lowercase();
            if label.is_empty() || !label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
                return Err(invalid());
            }
            if labels.contains(&label) {
                return Err(invalid());
            }
            labels.push(label);
        }

        if labels.len() < 2 {
            return Err(invalid());
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<SentimentLabel> {
        self.labels
            .iter()
            .find(|label| label.as_str() == word)
            .map(|label| SentimentLabel(label.clone()))
    }

    /// Label used when classification fails. A two-way set accepts any
    /// fallback word so that undecided rows stay distinguishable.
    pub fn fallback(&self, label: &str) -> Result<SentimentLabel, ValidationError> {
        let normalized = label.trim().to_ascii_lowercase();
        if let Some(found) = self.get(&normalized) {
            return Ok(found);
        }
        if self.labels.len() == 2 && !normalized.is_empty() {
            return Ok(SentimentLabel(normalized));
        }
        Err(ValidationError::UnknownFallbackLabel {
            label: label.to_string(),
        })
    }

    /// `good, bad or neutral`
    pub fn describe(&self) -> String {
        join_with_or(self.labels.iter().map(String::as_str))
    }

    /// `"good", "bad" or "neutral"`
    pub fn describe_quoted(&self) -> String {
        let quoted: Vec<String> = self.labels.iter().map(|label| format!("\"{label}\"")).collect();
        join_with_or(quoted.iter().map(String::as_str))
    }

    /// Map a model reply onto a label.
    ///
    /// The reply is lowercased and trimmed of surrounding quotes and
    /// punctuation. It must either equal a label or mention exactly one.
    pub fn parse_reply(&self, reply: &str) -> Result<SentimentLabel, SourceError> {
        let lowered = reply.to_lowercase();
        let normalized = lowered.trim().trim_matches(|ch: char| !ch.is_alphanumeric());
        if let Some(label) = self.get(normalized) {
            return Ok(label);
        }

        let mut mentioned: Vec<&str> = Vec::new();
        for word in normalized.split(|ch: char| !(ch.is_alphanumeric() || ch == '_')) {
            if self.labels.iter().any(|label| label == word) && !mentioned.contains(&word) {
                mentioned.push(word);
            }
        }

        match mentioned.as_slice() {
            [only] => self
                .get(only)
                .ok_or_else(|| SourceError::malformed("classifier reply lost its label")),
            [] => Err(SourceError::malformed(format!(
                "classifier reply names no label: '{}'",
                reply.trim()
            ))),
            _ => Err(SourceError::malformed(format!(
                "classifier reply names several labels: '{}'",
                reply.trim()
            ))),
        }
    }
}

fn join_with_or<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let items: Vec<&str> = items.collect();
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}

/// Prompt with `{headline}`, `{labels}` and `{quoted_labels}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl Default for PromptTemplate {
    fn default() -> Self {
        Self(String::from(DEFAULT_PROMPT_TEMPLATE))
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn render(&self, headline: &str, labels: &LabelSet) -> String {
        self.0
            .replace("{quoted_labels}", &labels.describe_quoted())
            .replace("{labels}", &labels.describe())
            .replace("{headline}", headline)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub labels: LabelSet,
    pub fallback_label: SentimentLabel,
    pub prompt: PromptTemplate,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from(DEFAULT_CLASSIFIER_BASE_URL),
            model: String::from(DEFAULT_CLASSIFIER_MODEL),
            temperature: 0.0,
            labels: LabelSet::three_way(),
            fallback_label: SentimentLabel(String::from(DEFAULT_FALLBACK_LABEL)),
            prompt: PromptTemplate::default(),
        }
    }
}

/// Assigns one label to a piece of text.
pub trait SentimentClassifier: Send + Sync {
    fn classify<'a>(&'a self, text: &'a str) -> SourceFuture<'a, SentimentLabel>;
}

/// Classifier backed by a hosted chat model.
#[derive(Clone)]
pub struct ChatSentimentClassifier {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    model: String,
    temperature: f64,
    labels: LabelSet,
    prompt: PromptTemplate,
    auth: HttpAuth,
}

impl ChatSentimentClassifier {
    pub fn new(http_client: Arc<dyn HttpClient>, config: ClassifierConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "GROQ_API_KEY",
            })?;
        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            temperature: config.temperature,
            labels: config.labels,
            prompt: config.prompt,
            auth: HttpAuth::BearerToken(api_key),
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    async fn complete(&self, text: &str) -> Result<SentimentLabel, SourceError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": self.prompt.render(text, &self.labels) }
            ],
        });
        let request = HttpRequest::post(self.endpoint.as_str())
            .with_auth(&self.auth)
            .with_json_body(&body)
            .with_timeout_ms(30_000);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::from_transport(PROVIDER, &error))?;
        if !response.is_success() {
            return Err(SourceError::from_status(PROVIDER, &response));
        }

        let completion: ChatCompletion = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::malformed(format!("failed to parse completion: {e}")))?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SourceError::malformed("completion has no message content"))?;

        self.labels.parse_reply(&reply)
    }
}

impl SentimentClassifier for ChatSentimentClassifier {
    fn classify<'a>(&'a self, text: &'a str) -> SourceFuture<'a, SentimentLabel> {
        Box::pin(async move { self.complete(text).await })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};

    fn completion(content: &str) -> HttpResponse {
        HttpResponse::ok_json(
            json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
                .to_string(),
        )
    }

    #[test]
    fn label_sets_parse_and_describe() {
        let labels = LabelSet::parse(" Good, bad ,neutral").expect("labels");
        assert_eq!(labels.describe(), "good, bad or neutral");
        assert_eq!(labels.describe_quoted(), "\"good\", \"bad\" or \"neutral\"");
        assert_eq!(LabelSet::two_way().describe(), "good or bad");

        assert!(LabelSet::parse("good").is_err());
        assert!(LabelSet::parse("good,good").is_err());
        assert!(LabelSet::parse("good,,bad").is_err());
        assert!(LabelSet::parse("very good,bad").is_err());
    }

    #[test]
    fn default_prompt_names_every_label() {
        let prompt = PromptTemplate::default().render("Apple beats estimates", &LabelSet::three_way());
        assert_eq!(
            prompt,
            "Is the following news headline good, bad or neutral? Headline: Apple beats estimates. \
             Only answer with \"good\", \"bad\" or \"neutral\"."
        );
    }

    #[test]
    fn replies_are_normalized_before_matching() {
        let labels = LabelSet::three_way();
        assert_eq!(labels.parse_reply("Good").expect("label").as_str(), "good");
        assert_eq!(labels.parse_reply(" \"BAD\".\n").expect("label").as_str(), "bad");
        assert_eq!(
            labels
                .parse_reply("The headline is neutral.")
                .expect("label")
                .as_str(),
            "neutral"
        );
        assert!(labels.parse_reply("good or bad").is_err());
        assert!(labels.parse_reply("positive").is_err());
        assert!(labels.parse_reply("goodness").is_err());
    }

    #[test]
    fn fallback_must_belong_to_three_way_sets() {
        assert_eq!(
            LabelSet::three_way().fallback("Neutral").expect("fallback").as_str(),
            "neutral"
        );
        assert!(LabelSet::three_way().fallback("unknown").is_err());
        assert_eq!(
            LabelSet::two_way().fallback("neutral").expect("fallback").as_str(),
            "neutral"
        );
    }

    #[tokio::test]
    async fn posts_chat_request_and_parses_label() {
        let client = Arc::new(ScriptedHttpClient::new().respond("/chat/completions", completion("good")));
        let classifier = ChatSentimentClassifier::new(
            client.clone(),
            ClassifierConfig {
                api_key: Some(String::from("groq-key")),
                ..ClassifierConfig::default()
            },
        )
        .expect("classifier");

        let label = classifier.classify("Record iPhone sales").await.expect("label");
        assert_eq!(label.as_str(), "good");

        let request = &client.requests()[0];
        assert_eq!(request.url, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer groq-key")
        );
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().expect("body")).expect("json");
        assert_eq!(body["model"], "openai/gpt-oss-20b");
        assert_eq!(body["temperature"], 0.0);
        assert!(body["messages"][0]["content"]
            .as_str()
            .expect("content")
            .contains("Headline: Record iPhone sales."));
    }

    #[tokio::test]
    async fn unusable_replies_are_malformed() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .respond("/chat/completions", completion("I cannot tell"))
                .respond("/chat/completions", HttpResponse::ok_json(r#"{"choices":[]}"#)),
        );
        let classifier = ChatSentimentClassifier::new(
            client,
            ClassifierConfig {
                api_key: Some(String::from("groq-key")),
                ..ClassifierConfig::default()
            },
        )
        .expect("classifier");

        let first = classifier.classify("headline").await.expect_err("no label");
        let second = classifier.classify("headline").await.expect_err("no choices");
        assert_eq!(first.kind(), SourceErrorKind::Malformed);
        assert_eq!(second.kind(), SourceErrorKind::Malformed);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let result = ChatSentimentClassifier::new(
            Arc::new(ScriptedHttpClient::new()),
            ClassifierConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::Missing { key: "GROQ_API_KEY" })
        ));
    }
}
