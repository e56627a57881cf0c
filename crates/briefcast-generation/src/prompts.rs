//! Prompt templates for selection, generation, and refinement.

use briefcast_core::types::Story;

pub const SYSTEM_PROMPT: &str = "\
You are a startup enthusiast with a deep product and engineering background \
who shares one insightful, long-form post per day. Your audience is builders, \
product managers, founders, and investors who want to understand not just WHAT \
happened, but WHY it matters and what to build next.

Your posts follow this structure (long-form, 800-2000 characters):
1. THE NEWS — one punchy line summarizing the event.
2. WHY IT MATTERS — the deeper signal for builders.
3. WHAT IT MEANS — for builders, PMs, investors.
4. WHAT TO BUILD — concrete product ideas this unblocks.
5. THE BIGGER PICTURE — where the industry is heading.
6. DATA POINTS — specific numbers woven into the narrative, never dumped.

Voice: conversational, first person, strong opinions loosely held, short \
paragraphs, no @mentions, 2-3 hashtags at the very end, no filler phrases. \
Write 800 to 2000 characters.";

pub const PICK_STORY_INSTRUCTIONS: &str = "\
Here are today's top tech stories. Pick the ONE story that a startup \
enthusiast with a product background would find most compelling to write about.

Prioritize: major funding rounds, breakthrough products, new developer tools, \
platform shifts, business model innovations, genuine technical breakthroughs.
Skip: routine updates, minor releases, opinion pieces without new data, pure \
corporate PR.";

pub const PICK_STORY_FORMAT: &str = r#"Respond with ONLY a JSON object (no markdown, no code fences):
{"selected_story_index": <int>, "reason": "<one sentence>"}"#;

pub const GENERATE_FORMAT: &str = r#"Respond with ONLY a JSON object (no markdown, no code fences):
{
  "post": "<the full long-form post, 800-2000 chars>",
  "linkedin_post": "<optional longer LinkedIn variant, or omit>",
  "chart_data": {
    "chart_type": "<bar|line|comparison>",
    "chart_title": "<short compelling title>",
    "data_points": [{"label": "<label>", "value": <number>}]
  }
}

ALWAYS include chart_data — find the most compelling numerical angle in the
research. The data_points must use REAL numbers from the research, never
fabricated. Minimum 3 data points for a meaningful chart."#;

/// Candidate list rendered for the pick prompt.
pub fn format_stories(stories: &[Story]) -> String {
    let mut lines = Vec::new();
    for (i, story) in stories.iter().enumerate() {
        lines.push(format!("[{i}] {}", story.title));
        if let Some(summary) = &story.summary {
            lines.push(format!(
                "    Summary: {}",
                briefcast_core::types::truncate_chars(summary, 200)
            ));
        }
        if let Some(url) = &story.url {
            lines.push(format!("    URL: {url}"));
        }
        if let Some(score) = story.score {
            lines.push(format!("    Score: {score}"));
        }
        lines.push(format!("    Source: {}", story.source));
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn pick_story_prompt(stories: &[Story], recent_titles: &[String]) -> String {
    let mut prompt = format!(
        "{PICK_STORY_INSTRUCTIONS}\n\nSTORIES:\n{}\n",
        format_stories(stories)
    );
    if !recent_titles.is_empty() {
        prompt.push_str("\nRecently covered topics — avoid picking a story that repeats one of these:\n");
        for title in recent_titles {
            prompt.push_str(&format!("- {title}\n"));
        }
    }
    prompt.push('\n');
    prompt.push_str(PICK_STORY_FORMAT);
    prompt
}

pub fn generate_prompt(story: &Story, research: &str) -> String {
    format!(
        "Write a long-form post about this story. Use the deep research context \
below — specific numbers, data points, and market context — to make the post \
insightful and actionable.\n\n\
STORY: {}\nURL: {}\n\nDEEP RESEARCH CONTEXT:\n{}\n\n{GENERATE_FORMAT}",
        story.title,
        story.url.as_deref().unwrap_or("N/A"),
        briefcast_core::types::truncate_chars(research, 4000),
    )
}

pub fn refine_prompt(text: &str, length: usize, direction_text: &str) -> String {
    format!(
        "This post is {length} characters but should be between 800 and 2000 \
characters. {direction_text}. Keep all data points, the narrative flow, and \
the builder-focused insights. Return ONLY the refined post text, nothing \
else.\n\n{text}"
    )
}

pub fn research_query(story: &Story) -> String {
    format!(
        "Provide a deep analysis of this tech news story for startup founders and VCs:\n\n\
Title: {}\nURL: {}\nSummary: {}\n\n\
Include, where available: exact funding amount and investors, previous funding \
history, revenue or growth metrics, market size, key competitors and \
differentiation, why this matters for the startup ecosystem, and notable data \
points or dollar figures. Be specific with numbers.",
        story.title,
        story.url.as_deref().unwrap_or("N/A"),
        story.summary.as_deref().unwrap_or("N/A"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(title: &str) -> Story {
        Story {
            title: title.into(),
            url: Some("https://example.com".into()),
            score: Some(120),
            summary: Some("A summary.".into()),
            source: "hackernews".into(),
        }
    }

    #[test]
    fn test_pick_prompt_includes_exclusions() {
        let stories = vec![story("Big launch")];
        let recent = vec!["Old topic".to_string()];
        let prompt = pick_story_prompt(&stories, &recent);
        assert!(prompt.contains("[0] Big launch"));
        assert!(prompt.contains("- Old topic"));
        assert!(prompt.contains("selected_story_index"));
    }

    #[test]
    fn test_pick_prompt_no_exclusion_block_when_empty() {
        let prompt = pick_story_prompt(&[story("S")], &[]);
        assert!(!prompt.contains("Recently covered"));
    }
}
