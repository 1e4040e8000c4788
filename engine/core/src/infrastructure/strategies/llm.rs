// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM-Backed Reasoning Strategy
//
// Anti-Corruption Layer for any OpenAI-compatible chat completions API.
// The model is asked for a fixed three-line reply (ASSESSMENT /
// RECOMMENDATION / CONFIDENCE) which is parsed strictly; anything else is an
// InvalidResponse and the router falls back to the rule-based strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::disruption::DisruptionEvent;
use crate::domain::reasoning::{Assessment, Recommendation, ReasoningError, ReasoningStrategy};
use crate::domain::route::Shipment;
use aegis_sentinel_context::ScoredEntry;

const SYSTEM_PROMPT: &str = "You are a logistics command agent assessing real-time \
disruptions (strikes, blockages, weather, road closures) against in-flight shipments. \
Reply with exactly three lines:\n\
ASSESSMENT: <max two sentences on the impact>\n\
RECOMMENDATION: CRITICAL | WARNING | ADVISORY\n\
CONFIDENCE: <0.00-1.00>";

pub struct LlmStrategy {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl LlmStrategy {
    pub fn new(endpoint: String, api_key: String, model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint,
            api_key,
            model,
        }
    }

    fn build_prompt(
        disruption: &DisruptionEvent,
        shipment: Option<&Shipment>,
        context: &[ScoredEntry],
    ) -> String {
        let mut prompt = format!(
            "LIVE DISRUPTION DETECTED:\n\
             Summary: {}\n\
             Category: {}\n\
             Location: {}\n\
             Risk score: {:.0}/100\n\
             Route: {}\n",
            disruption.event.summary,
            disruption.event.category.as_str(),
            disruption.event.location_name.as_deref().unwrap_or("unknown"),
            disruption.risk_score,
            disruption.route_id,
        );

        if let Some(shipment) = shipment {
            prompt.push_str(&format!(
                "Shipment: {} (cargo value ${:.0}, perishable: {}, progress {:.0}%)\n",
                shipment.id,
                shipment.cargo.value_usd,
                shipment.cargo.perishable,
                shipment.progress * 100.0,
            ));
        }

        if !context.is_empty() {
            prompt.push_str("\nHISTORICAL PRECEDENTS (most relevant first):\n");
            for scored in context {
                prompt.push_str(&format!(
                    "- [{}] {} (relevance {:.2})\n",
                    scored.entry.category, scored.entry.text, scored.score
                ));
            }
        }

        prompt.push_str("\nAssess the impact on this specific shipment.");
        prompt
    }

    fn parse_reply(reply: &str, model: &str) -> Result<Assessment, ReasoningError> {
        let mut text = None;
        let mut recommendation = None;
        let mut confidence = None;

        for line in reply.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("ASSESSMENT:") {
                text = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("RECOMMENDATION:") {
                recommendation = Recommendation::parse(rest);
            } else if let Some(rest) = line.strip_prefix("CONFIDENCE:") {
                confidence = rest.trim().parse::<f64>().ok();
            }
        }

        match (text, recommendation, confidence) {
            (Some(text), Some(recommendation), Some(confidence))
                if (0.0..=1.0).contains(&confidence) =>
            {
                Ok(Assessment {
                    text,
                    confidence,
                    recommendation,
                    strategy: format!("llm:{model}"),
                })
            }
            _ => Err(ReasoningError::InvalidResponse(
                reply.chars().take(200).collect(),
            )),
        }
    }
}

#[async_trait]
impl ReasoningStrategy for LlmStrategy {
    async fn analyze(
        &self,
        disruption: &DisruptionEvent,
        shipment: Option<&Shipment>,
        context: &[ScoredEntry],
    ) -> Result<Assessment, ReasoningError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: Self::build_prompt(disruption, shipment, context),
                },
            ],
            temperature: 0.1,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.endpoint.trim_end_matches('/')
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status == 401 || status == 403 {
                ReasoningError::Authentication(body)
            } else {
                ReasoningError::Provider(format!("HTTP {}: {}", status, body))
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Provider(format!("Failed to parse response: {}", e)))?;

        let reply = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ReasoningError::Provider("Empty completion".into()))?;

        Self::parse_reply(reply, &self.model)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
