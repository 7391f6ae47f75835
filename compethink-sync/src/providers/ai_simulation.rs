//! AI-simulation client
//!
//! Asks a generative-analysis service (Gemini `generateContent` API) to
//! estimate qualitative signals for a domain: UX quality, brand authority,
//! visibility in each AI engine, tech-stack maturity, content quality and
//! branded-search share. The reply is constrained by a JSON schema derived
//! from [`AiAssessment`]; anything that does not parse into it is "no data".

use super::{AiSimulationProvider, PerformanceScores};
use crate::fetch::{attempt, FetchError, RetryPolicy};
use async_trait::async_trait;
use compethink_common::config::ProvidersConfig;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Estimates returned by the AI simulation, each on a 0-100 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AiAssessment {
    /// Perceived UX quality of the site
    #[serde(default = "neutral_score")]
    pub qualitative_ux: f64,
    pub brand_authority: f64,
    /// Visibility in ChatGPT answers
    pub chatgpt: f64,
    /// Visibility in Perplexity answers
    pub perplexity: f64,
    /// Visibility in Gemini answers
    pub gemini: f64,
    /// Maturity of the marketing/sales/service technology stack
    pub tech_stack: f64,
    #[serde(default = "neutral_score")]
    pub content_quality: f64,
    /// Share of organic traffic from branded searches
    pub branded_share: f64,
    /// Short justification of the estimates
    pub ai_justification: String,
}

fn neutral_score() -> f64 {
    50.0
}

impl AiAssessment {
    /// Output schema sent with the request
    ///
    /// Every property is required and no others are allowed.
    pub fn response_schema() -> Value {
        let schema = schema_for!(AiAssessment);
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        require_all_properties(&mut value);
        if let Value::Object(map) = &mut value {
            map.remove("$schema");
            map.remove("title");
            map.remove("definitions");
        }
        value
    }
}

fn require_all_properties(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };
    if map.get("type").and_then(Value::as_str) == Some("object") {
        map.insert("additionalProperties".to_string(), Value::Bool(false));
        if let Some(Value::Object(props)) = map.get("properties") {
            let keys = props.keys().cloned().map(Value::String).collect();
            map.insert("required".to_string(), Value::Array(keys));
        }
        // serde defaults leak into the schema as "default"; the model must not rely on them
        if let Some(Value::Object(props)) = map.get_mut("properties") {
            for prop in props.values_mut() {
                if let Value::Object(p) = prop {
                    p.remove("default");
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_json_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Analysis instruction for one domain
fn build_prompt(domain: &str, technical: Option<&PerformanceScores>) -> String {
    let mut prompt = format!(
        "You are a digital marketing analyst. Estimate, for the website \"{domain}\", \
         the following scores on a 0-100 scale:\n\
         - qualitative_ux: perceived quality of the user experience\n\
         - brand_authority: strength of the brand in its market\n\
         - chatgpt, perplexity, gemini: how visible and recommended the brand is in answers from each AI engine\n\
         - tech_stack: maturity of its marketing, sales and customer-service tooling\n\
         - content_quality: depth and freshness of its editorial content\n\
         - branded_share: estimated percentage of organic traffic coming from branded searches\n\
         Add a short ai_justification (two sentences at most) explaining the estimates.\n"
    );
    if let Some(t) = technical {
        prompt.push_str(&format!(
            "Measured page audit for context: performance {}, SEO {}, accessibility {}, best practices {}.\n",
            t.performance, t.seo, t.accessibility, t.best_practices
        ));
    }
    prompt.push_str("Answer with JSON only.");
    prompt
}

/// Strip a surrounding markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's reply into an assessment
fn parse_reply(body: &str) -> Result<AiAssessment, FetchError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("unexpected AI response: {e}")))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(FetchError::Malformed("AI response has no text".to_string()));
    }

    serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| FetchError::Malformed(format!("AI reply does not match schema: {e}")))
}

/// HTTP client for the generative-analysis service
pub struct AiSimulationClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl AiSimulationClient {
    pub fn new(http_client: reqwest::Client, config: &ProvidersConfig, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
            model: config.ai_model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            policy: RetryPolicy::single(config.ai_timeout_ms),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Issue the structured-output request
    pub async fn request_assessment(
        &self,
        api_key: &str,
        domain: &str,
        technical: Option<&PerformanceScores>,
    ) -> Result<AiAssessment, FetchError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(domain, technical)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: AiAssessment::response_schema(),
            },
        };

        let url = self.endpoint();
        let (http_client, url, request) = (&self.http_client, &url, &request);
        let body = attempt("AI simulation", &self.policy, || async move {
            let response = http_client
                .post(url)
                .query(&[("key", api_key)])
                .json(request)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(FetchError::from_status(status.as_u16(), text));
            }
            Ok(text)
        })
        .await?;

        parse_reply(&body)
    }
}

#[async_trait]
impl AiSimulationProvider for AiSimulationClient {
    async fn assess(
        &self,
        domain: &str,
        technical: Option<&PerformanceScores>,
    ) -> Option<AiAssessment> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!(domain, "No AI credential, skipping AI simulation");
            return None;
        };

        match self.request_assessment(api_key, domain, technical).await {
            Ok(assessment) => {
                tracing::info!(
                    domain,
                    chatgpt = assessment.chatgpt,
                    brand_authority = assessment.brand_authority,
                    "AI simulation complete"
                );
                Some(assessment)
            }
            Err(e) => {
                tracing::warn!(domain, model = %self.model, error = %e, "AI simulation unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(text: &str) -> String {
        json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
        .to_string()
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = AiAssessment::response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();

        for field in [
            "qualitative_ux",
            "brand_authority",
            "chatgpt",
            "perplexity",
            "gemini",
            "tech_stack",
            "content_quality",
            "branded_share",
            "ai_justification",
        ] {
            assert!(required.contains(&field), "{field} not required");
        }
        assert_eq!(schema["additionalProperties"], json!(false));
        assert!(schema["properties"]["qualitative_ux"].get("default").is_none());
    }

    #[test]
    fn test_parse_valid_reply() {
        let body = reply(
            r#"{"qualitative_ux": 72, "brand_authority": 60, "chatgpt": 40, "perplexity": 35,
                "gemini": 55, "tech_stack": 50, "content_quality": 64, "branded_share": 22,
                "ai_justification": "Solid brand, thin blog."}"#,
        );
        let assessment = parse_reply(&body).unwrap();
        assert_eq!(assessment.chatgpt, 40.0);
        assert_eq!(assessment.ai_justification, "Solid brand, thin blog.");
    }

    #[test]
    fn test_missing_qualitative_inputs_default_to_neutral() {
        let body = reply(
            r#"{"brand_authority": 60, "chatgpt": 40, "perplexity": 35, "gemini": 55,
                "tech_stack": 50, "branded_share": 22, "ai_justification": "-"}"#,
        );
        let assessment = parse_reply(&body).unwrap();
        assert_eq!(assessment.qualitative_ux, 50.0);
        assert_eq!(assessment.content_quality, 50.0);
    }

    #[test]
    fn test_fenced_reply_is_accepted() {
        let body = reply(
            "```json\n{\"qualitative_ux\": 1, \"brand_authority\": 2, \"chatgpt\": 3, \"perplexity\": 4, \
             \"gemini\": 5, \"tech_stack\": 6, \"content_quality\": 7, \"branded_share\": 8, \
             \"ai_justification\": \"x\"}\n```",
        );
        assert_eq!(parse_reply(&body).unwrap().gemini, 5.0);
    }

    #[test]
    fn test_unparseable_replies_are_malformed() {
        assert!(matches!(parse_reply("not json"), Err(FetchError::Malformed(_))));
        assert!(matches!(parse_reply(r#"{"candidates": []}"#), Err(FetchError::Malformed(_))));
        assert!(matches!(
            parse_reply(&reply("I cannot help with that.")),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply(&reply(r#"{"chatgpt": 40}"#)),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_prompt_mentions_domain_and_audit() {
        let technical = PerformanceScores {
            performance: 81,
            seo: 92,
            accessibility: 77,
            best_practices: 100,
        };
        let prompt = build_prompt("acme.it", Some(&technical));
        assert!(prompt.contains("\"acme.it\""));
        assert!(prompt.contains("performance 81"));
        assert!(!build_prompt("acme.it", None).contains("Measured page audit"));
    }

    #[tokio::test]
    async fn test_missing_credential_skips_request() {
        let client = AiSimulationClient::new(reqwest::Client::new(), &ProvidersConfig::default(), None);
        assert!(client.assess("acme.it", None).await.is_none());
    }
}
