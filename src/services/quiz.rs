use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub const NO_SUGGESTION: &str = "No recommendation available";

const ANY: &str = "Doesn't matter";

/// Answers collected by the "what to watch" quiz
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuizAnswers {
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub engagement: Option<String>,
    #[serde(default)]
    pub themes: Option<String>,
    #[serde(default, rename = "cinemaEra")]
    pub cinema_era: Option<String>,
    #[serde(default)]
    pub avoid_genres: Option<String>,
    #[serde(default)]
    pub emotional_response: Option<String>,
}

fn answered(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn or_unspecified(value: &Option<String>) -> &str {
    answered(value).unwrap_or("Not specified")
}

fn preference(value: &Option<String>, skip: &str, fallback: &'static str) -> String {
    match answered(value) {
        Some(v) if v != skip => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Builds the prompt sent to the text model
pub fn build_prompt(answers: &QuizAnswers) -> String {
    format!(
        "Based on the following preferences, suggest a movie or series title ONLY:\n\
         - Mood: {}\n\
         - Occasion: {}\n\
         - Available Time: {}\n\
         - Level of Engagement: {}\n\
         - Preferred Themes: {}\n\
         - Preferred Cinema Era: {}\n\
         - Genres to Avoid: {}\n\
         - Desired Emotional Response: {}\n",
        or_unspecified(&answers.mood),
        or_unspecified(&answers.occasion),
        or_unspecified(&answers.time),
        or_unspecified(&answers.engagement),
        preference(&answers.themes, ANY, "No specific preference"),
        preference(&answers.cinema_era, ANY, "No specific preference"),
        preference(&answers.avoid_genres, "None", "No specific restrictions"),
        or_unspecified(&answers.emotional_response),
    )
}

/// Suggests a single title from quiz answers
#[async_trait::async_trait]
pub trait QuizAdvisor: Send + Sync {
    async fn suggest(&self, answers: &QuizAnswers) -> AppResult<String>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Google Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiAdvisor {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiAdvisor {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait::async_trait]
impl QuizAdvisor for GeminiAdvisor {
    async fn suggest(&self, answers: &QuizAnswers) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(answers) }] }]
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini request failed");
            return Err(AppError::ExternalApi(
                "Failed to generate recommendation".to_string(),
            ));
        }

        let generated: GenerateResponse = response.json().await?;
        let suggestion = generated
            .first_text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_SUGGESTION.to_string());

        tracing::info!(model = %self.model, "Quiz recommendation generated");

        Ok(suggestion)
    }
}
