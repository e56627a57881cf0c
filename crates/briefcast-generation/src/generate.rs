//! Structured generation over the chat client: select-best, generate,
//! refine, and the fence-tolerant JSON parsing they share.

use async_trait::async_trait;
use serde_json::Value;

use briefcast_core::Result;
use briefcast_core::error::BriefcastError;
use briefcast_core::types::{ChartKind, ChartSpec, DataPoint, Draft, Story};

use crate::client::ChatClient;
use crate::prompts;
use crate::{GenerationClient, RefineDirection};

pub struct ChatGenerationClient {
    chat: ChatClient,
}

impl ChatGenerationClient {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl GenerationClient for ChatGenerationClient {
    async fn select_best(&self, stories: &[Story], recent_titles: &[String]) -> Result<usize> {
        let prompt = prompts::pick_story_prompt(stories, recent_titles);
        let reply = self.chat.chat(None, &prompt).await?;
        let parsed = parse_json_reply(&reply)?;

        let index = parsed["selected_story_index"]
            .as_u64()
            .ok_or_else(|| BriefcastError::parse("Pick reply missing selected_story_index"))?
            as usize;
        if index >= stories.len() {
            return Err(BriefcastError::parse(format!(
                "Pick index {index} out of range ({} candidates)",
                stories.len()
            )));
        }

        if let Some(reason) = parsed["reason"].as_str() {
            tracing::info!("Picked story [{index}]: {} ({reason})", stories[index].title);
        }
        Ok(index)
    }

    async fn generate(&self, story: &Story, research: &str) -> Result<Draft> {
        let prompt = prompts::generate_prompt(story, research);
        let reply = self.chat.chat(Some(prompts::SYSTEM_PROMPT), &prompt).await?;
        let parsed = parse_json_reply(&reply)?;

        let text = parsed["post"]
            .as_str()
            .ok_or_else(|| BriefcastError::parse("Generate reply missing post text"))?
            .to_string();
        let linkedin_text = parsed["linkedin_post"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(String::from);
        let chart = parse_chart_spec(&parsed["chart_data"]);

        Ok(Draft {
            text,
            linkedin_text,
            chart,
        })
    }

    async fn refine(&self, text: &str, direction: RefineDirection) -> Result<String> {
        let direction_text = match direction {
            RefineDirection::Trim => "Trim it to under 2000 characters",
            RefineDirection::Expand => {
                "Expand it to at least 800 characters with more builder-focused insights and concrete ideas"
            }
        };
        let prompt = prompts::refine_prompt(text, text.chars().count(), direction_text);
        let refined = self.chat.chat(None, &prompt).await?;
        Ok(refined.trim().to_string())
    }
}

/// Parse a model reply as JSON, tolerating markdown code fences the model
/// was told not to emit but sometimes does anyway.
pub fn parse_json_reply(reply: &str) -> Result<Value> {
    let mut text = reply.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        // Drop the fence line ("```json" or bare "```") and the closing fence.
        text = stripped.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }
    serde_json::from_str(text).map_err(|e| BriefcastError::parse(format!("Malformed reply: {e}")))
}

/// Pull a chart spec out of the reply's `chart_data`, tolerating missing
/// or partial fields — the render stage handles too-few points.
fn parse_chart_spec(value: &Value) -> ChartSpec {
    let kind = match value["chart_type"].as_str() {
        Some("line") => ChartKind::Line,
        Some("comparison") => ChartKind::Comparison,
        _ => ChartKind::Bar,
    };
    let points = value["data_points"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|p| {
                    Some(DataPoint {
                        label: p["label"].as_str()?.to_string(),
                        value: p["value"].as_f64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ChartSpec {
        kind,
        title: value["chart_title"].as_str().unwrap_or_default().to_string(),
        points,
    }
}
