//! ReAct agent loop.

use common::config::AgentSettings;

use crate::database::SqlDatabase;
use crate::error::{AgentError, AgentResult};
use crate::llm::LanguageModel;
use crate::output_parser::{self, AgentStep};
use crate::prompt::{agent_prompt, STOP_SEQUENCES};
use crate::toolkit::SqlToolkit;

/// An agent bound to one database handle and one language model.
///
/// Agents are cheap and single-use: build one per question.
pub struct SqlAgent<'a> {
    db: &'a SqlDatabase,
    llm: &'a dyn LanguageModel,
    settings: AgentSettings,
}

impl<'a> SqlAgent<'a> {
    pub fn new(db: &'a SqlDatabase, llm: &'a dyn LanguageModel, settings: AgentSettings) -> Self {
        Self { db, llm, settings }
    }

    /// Answers `question`, returning the model's final answer verbatim.
    ///
    /// # Errors
    /// Fails on any language-model error, on a reply that cannot be parsed,
    /// or when `max_iterations` tool calls pass without a final answer.
    pub async fn run(&self, question: &str) -> AgentResult<String> {
        let toolkit = SqlToolkit::new(self.db, self.llm);
        let prompt = agent_prompt(self.db.dialect(), self.settings.top_k, question);
        let mut scratchpad = String::new();

        tracing::info!(
            model = self.llm.model_name(),
            dialect = %self.db.dialect(),
            "智能体开始执行"
        );

        for iteration in 1..=self.settings.max_iterations {
            let reply = self
                .llm
                .complete(&format!("{prompt}{scratchpad}"), &STOP_SEQUENCES)
                .await?;

            match output_parser::parse(&reply)? {
                AgentStep::Finish { answer } => {
                    tracing::info!(iterations = iteration, "智能体得到最终答案");
                    return Ok(answer);
                }
                AgentStep::Action { tool, input, log } => {
                    tracing::debug!(iteration, tool = %tool, input = %input, "调用工具");
                    let observation = toolkit.invoke(&tool, &input).await?;
                    tracing::debug!(iteration, tool = %tool, observation = %observation, "工具返回");

                    scratchpad.push_str(log.trim_end());
                    scratchpad.push_str("\nObservation: ");
                    scratchpad.push_str(&observation);
                    scratchpad.push_str("\nThought: ");
                }
            }
        }

        Err(AgentError::IterationLimit(self.settings.max_iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::testing::{ScriptedModel, SqliteFixture};

    fn settings(max_iterations: usize) -> AgentSettings {
        AgentSettings {
            max_iterations,
            ..AgentSettings::default()
        }
    }

    #[tokio::test]
    async fn test_answers_after_tool_steps() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();
        let llm = ScriptedModel::count_users_script();

        let agent = SqlAgent::new(&db, &llm, settings(15));
        let answer = agent.run("How many rows are in the users table?").await.unwrap();
        assert_eq!(answer, "There are 3 rows in the users table.");

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].contains("Question: How many rows are in the users table?"));
        assert!(prompts[1].contains("Observation: orders, users\nThought: "));
        assert!(prompts[2].contains("CREATE TABLE users ("));
        assert!(prompts[3].contains("Observation: COUNT(*)\n3\nThought: "));
        db.close().await;
    }

    #[tokio::test]
    async fn test_gives_up_after_iteration_limit() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();
        let llm = ScriptedModel::new(vec!["Action: list_tables\nAction Input: "; 5]);

        let agent = SqlAgent::new(&db, &llm, settings(2));
        let err = agent.run("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimit(2)));
        assert_eq!(llm.prompts().len(), 2);
        db.close().await;
    }

    #[tokio::test]
    async fn test_unparsable_reply_fails() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();
        let llm = ScriptedModel::new(["Three, probably."]);

        let err = SqlAgent::new(&db, &llm, settings(15)).run("How many users?").await.unwrap_err();
        assert!(matches!(err, AgentError::OutputParse(_)));
        db.close().await;
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();
        let llm = ScriptedModel::failing("quota exhausted");

        let err = SqlAgent::new(&db, &llm, settings(15)).run("How many users?").await.unwrap_err();
        match err {
            AgentError::Llm(LlmError::Api { message, .. }) => assert_eq!(message, "quota exhausted"),
            other => panic!("unexpected error: {other:?}"),
        }
        db.close().await;
    }
}
