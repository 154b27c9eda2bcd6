use regex::Regex;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::models::{is_blank_review, Classification, ClassificationOrigin, Sentiment};

const SYSTEM_ROLE: &str = "You are a sentiment analysis expert. Always respond in the exact format requested.";

/// Characters of the review reused as the summary when the model gives none
const SUMMARY_FALLBACK_CHARS: usize = 100;

const POSITIVE_INDICATORS: [&str; 5] = ["positive", "good", "great", "love", "excellent"];
const NEGATIVE_INDICATORS: [&str; 5] = ["negative", "bad", "poor", "terrible", "disappointed"];

/// Build the instruction prompt for one review
#[must_use]
pub fn build_prompt(review_text: &str) -> String {
    format!(
        "You are analyzing a product review. Read it carefully and respond with EXACTLY this format:

SENTIMENT: [Choose ONLY one: Positive OR Negative OR Neutral]
SUMMARY: [Write one clear sentence summarizing the review]

Review to analyze: \"{review_text}\"

Remember:
- Positive: Customer likes the product (good, great, love, recommend, etc.)
- Negative: Customer dislikes it (bad, terrible, disappointed, poor quality, etc.)
- Neutral: Mixed feelings or just describing facts

Your response:"
    )
}

/// Line-oriented parser for the two-line `SENTIMENT:` / `SUMMARY:` reply
pub struct ResponseParser {
    label_regex: Regex,
}

/// What the parser could recover from a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Sentiment from the labelled line or the keyword heuristic
    pub sentiment: Sentiment,
    /// Summary from the labelled line, if present
    pub summary: Option<String>,
    /// True when a labelled sentiment line was found
    pub labelled: bool,
}

impl ResponseParser {
    /// Create a parser
    pub fn new() -> Result<Self> {
        // Tolerates markdown emphasis and bullets around the label, e.g. "**Sentiment:** Positive"
        let label_regex = Regex::new(r"(?i)^[\s*_#>-]*(sentiment|summary)[\s*_]*:[\s*_]*(.*)$")
            .map_err(|e| PipelineError::Other(format!("Failed to compile label regex: {e}")))?;
        Ok(Self { label_regex })
    }

    /// Parse a raw model reply
    #[must_use]
    pub fn parse(&self, response: &str) -> ParsedResponse {
        let mut sentiment = None;
        let mut summary = None;

        for line in response.lines() {
            let Some(caps) = self.label_regex.captures(line.trim()) else {
                continue;
            };
            let value = caps.get(2).map_or("", |m| m.as_str()).trim();
            if caps[1].eq_ignore_ascii_case("sentiment") {
                sentiment = Some(Sentiment::from_model_output(value));
            } else {
                summary = Some(value.trim_end_matches(['*', '_']).trim().to_string());
            }
        }

        match sentiment {
            Some(sentiment) => ParsedResponse { sentiment, summary, labelled: true },
            None => ParsedResponse {
                sentiment: keyword_sentiment(response),
                summary,
                labelled: false,
            },
        }
    }
}

/// Keyword heuristic over the whole reply; the positive family is checked first.
#[must_use]
pub fn keyword_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    if POSITIVE_INDICATORS.iter().any(|w| lower.contains(w)) {
        Sentiment::Positive
    } else if NEGATIVE_INDICATORS.iter().any(|w| lower.contains(w)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn summary_fallback(review_text: &str) -> String {
    review_text.chars().take(SUMMARY_FALLBACK_CHARS).collect()
}

/// Classifies one review through the completion service.
///
/// Never fails: empty input and service errors both map to a neutral result,
/// distinguished by [`ClassificationOrigin`].
pub struct ReviewClassifier<C> {
    client: C,
    parser: ResponseParser,
    temperature: f32,
    max_tokens: u32,
}

impl<C: CompletionClient> ReviewClassifier<C> {
    /// Wrap a completion client with the request settings from `config`
    pub fn new(client: C, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client,
            parser: ResponseParser::new()?,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Classify one review
    pub async fn classify(&self, review_text: &str) -> Classification {
        if is_blank_review(review_text) {
            return Classification::empty_input();
        }

        let request = CompletionRequest {
            system: SYSTEM_ROLE.to_string(),
            prompt: build_prompt(review_text),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match self.client.complete(&request).await {
            Ok(reply) => {
                let parsed = self.parser.parse(&reply);
                if !parsed.labelled {
                    debug!(sentiment = %parsed.sentiment, "Reply had no sentiment line, used keyword heuristic");
                }
                Classification {
                    sentiment: parsed.sentiment,
                    summary: parsed.summary.unwrap_or_else(|| summary_fallback(review_text)),
                    origin: ClassificationOrigin::Model,
                }
            }
            Err(e) => {
                warn!("Error calling classifier service: {e}");
                Classification::failed()
            }
        }
    }
}
