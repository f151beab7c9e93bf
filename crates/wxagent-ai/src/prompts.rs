//! Prompt text for each capability.

use crate::context::ReducedContext;

pub const SYSTEM_SUMMARY: &str = "You are a meteorologist. Using the JSON data, summarize the current \
weather and the next 12 hours in 2-4 sentences and state your confidence (Low/Medium/High). \
After the summary, give at most 4 bullet points of clear, actionable advice using the units of \
the data. Keep a neutral tone and avoid sensationalism.";

pub const SYSTEM_ALERTS: &str = "You are a weather-risk analyst. Analyze the JSON data and reply with a \
JSON object with the fields: severity (none|low|moderate|high|extreme), headline (at most 80 \
characters), risks (a list of objects {type: heat|rain|wind|uv|visibility|storm, level: integer \
1-5, why}) and advice (a list of short sentences).";

pub const SYSTEM_QA: &str = "You are a weather assistant. Answer in at most 6 sentences using only the \
JSON data provided, in the units of the data. If the data does not cover the question, say so \
instead of guessing.";

pub fn summary_prompt(context: &ReducedContext<'_>) -> String {
    format!(
        "Below is weather data as JSON. Follow the system instructions to summarize it, state \
         your confidence and give suitable tips.\n{}",
        fenced(context)
    )
}

pub fn alerts_prompt(context: &ReducedContext<'_>) -> String {
    format!(
        "Extract the weather risks from the following JSON data and reply with JSON as \
         instructed.\n{}",
        fenced(context)
    )
}

pub fn chat_prompt(context: &ReducedContext<'_>, question: &str) -> String {
    format!(
        "Weather data JSON:\n{}\nQuestion: {}",
        fenced(context),
        question.trim()
    )
}

fn fenced(context: &ReducedContext<'_>) -> String {
    format!("```json\n{}\n```", context.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wxagent_weather::{ConditionSet, Location, Units, WeatherSnapshot};

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            location: Location {
                name: "Da Nang".to_string(),
                lat: 16.05,
                lon: 108.2,
            },
            current: ConditionSet::default(),
            hourly: Vec::new(),
            daily: Vec::new(),
            provider: "openweather".to_string(),
            fetched_at: Utc::now(),
            units: Units::Metric,
        }
    }

    #[test]
    fn test_prompts_embed_fenced_context() {
        let snap = snapshot();
        let context = ReducedContext::from_snapshot(&snap);

        for prompt in [summary_prompt(&context), alerts_prompt(&context)] {
            assert!(prompt.contains("```json\n{"));
            assert!(prompt.contains("Da Nang"));
            assert!(prompt.trim_end().ends_with("```"));
        }
    }

    #[test]
    fn test_chat_prompt_trims_question() {
        let snap = snapshot();
        let prompt = chat_prompt(&ReducedContext::from_snapshot(&snap), "  Will it rain?\n");
        assert!(prompt.ends_with("Question: Will it rain?"));
    }
}
