//! Parses ReAct-formatted model replies.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AgentError, AgentResult};

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action pattern is valid")
});

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    /// Invoke `tool` with `input`. `log` is the raw reply, kept for the
    /// scratchpad.
    Action {
        tool: String,
        input: String,
        log: String,
    },
    /// The model produced its answer.
    Finish { answer: String },
}

/// Parses one model reply into an [`AgentStep`].
///
/// A reply carrying both an action and a final answer is ambiguous and
/// rejected, as is a reply carrying neither.
pub fn parse(text: &str) -> AgentResult<AgentStep> {
    let has_final = text.contains(FINAL_ANSWER_MARKER);

    if let Some(caps) = ACTION_RE.captures(text) {
        if has_final {
            return Err(AgentError::OutputParse(format!(
                "reply contains both a final answer and an action: {}",
                text
            )));
        }
        let tool = caps[1].trim().trim_matches('*').trim().to_string();
        let input = clean_input(&caps[2]);
        return Ok(AgentStep::Action {
            tool,
            input,
            log: text.to_string(),
        });
    }

    if has_final {
        let answer = text
            .rsplit(FINAL_ANSWER_MARKER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(AgentStep::Finish { answer });
    }

    Err(AgentError::OutputParse(text.to_string()))
}

/// Strips a hallucinated observation tail, whitespace and wrapping quotes.
fn clean_input(raw: &str) -> String {
    let raw = raw.split("\nObservation").next().unwrap_or(raw);
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_action() {
        let step = parse("Thought: I should list tables.\nAction: list_tables\nAction Input: ").unwrap();
        assert_eq!(
            step,
            AgentStep::Action {
                tool: "list_tables".into(),
                input: String::new(),
                log: "Thought: I should list tables.\nAction: list_tables\nAction Input: ".into(),
            }
        );
    }

    #[test]
    fn test_parses_multiline_action_input() {
        let step = parse("Action: run_query\nAction Input: SELECT name\nFROM users\nLIMIT 10").unwrap();
        match step {
            AgentStep::Action { tool, input, .. } => {
                assert_eq!(tool, "run_query");
                assert_eq!(input, "SELECT name\nFROM users\nLIMIT 10");
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_strips_quotes_and_observation_tail() {
        let step = parse("Action: describe_tables\nAction Input: \"users\"\nObservation: made up").unwrap();
        match step {
            AgentStep::Action { input, .. } => assert_eq!(input, "users"),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_parses_final_answer() {
        let step = parse("Thought: I now know the final answer\nFinal Answer: There are 3 users.").unwrap();
        assert_eq!(
            step,
            AgentStep::Finish {
                answer: "There are 3 users.".into()
            }
        );
    }

    #[test]
    fn test_rejects_action_and_final_answer_together() {
        let err = parse("Action: list_tables\nAction Input: \nFinal Answer: 3").unwrap_err();
        assert!(matches!(err, AgentError::OutputParse(_)));
    }

    #[test]
    fn test_rejects_free_text() {
        let err = parse("I think there are three users.").unwrap_err();
        assert!(err.to_string().contains("I think there are three users."));
    }
}
