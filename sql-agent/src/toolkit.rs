//! Tools the agent can call against the database.

use common::utils::SqlValidator;

use crate::database::SqlDatabase;
use crate::error::{AgentError, AgentResult};
use crate::llm::LanguageModel;
use crate::prompt::query_checker_prompt;

/// The tool set exposed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTool {
    ListTables,
    DescribeTables,
    RunQuery,
    CheckQuery,
}

impl SqlTool {
    pub const ALL: [SqlTool; 4] = [
        SqlTool::ListTables,
        SqlTool::DescribeTables,
        SqlTool::RunQuery,
        SqlTool::CheckQuery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SqlTool::ListTables => "list_tables",
            SqlTool::DescribeTables => "describe_tables",
            SqlTool::RunQuery => "run_query",
            SqlTool::CheckQuery => "check_query",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SqlTool::ListTables => {
                "Input is an empty string. Output is a comma-separated list of tables in the database."
            }
            SqlTool::DescribeTables => {
                "Input is a comma-separated list of tables. Output is the schema and sample rows for those tables. \
                 Call list_tables first to be sure the tables exist. Example input: table1, table2"
            }
            SqlTool::RunQuery => {
                "Input is a detailed and correct read-only SQL query. Output is the result as tab-separated rows \
                 with a header line. If the query is not correct, an error message is returned; rewrite the query, \
                 check it, and try again. If you get an unknown column error, use describe_tables to look up the \
                 correct columns."
            }
            SqlTool::CheckQuery => {
                "Input is a SQL query. Output is the query after a review for common mistakes. \
                 Always use this tool before running a query with run_query."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Tools bound to one database handle and one language model.
pub struct SqlToolkit<'a> {
    db: &'a SqlDatabase,
    llm: &'a dyn LanguageModel,
}

impl<'a> SqlToolkit<'a> {
    pub fn new(db: &'a SqlDatabase, llm: &'a dyn LanguageModel) -> Self {
        Self { db, llm }
    }

    /// Runs the named tool and returns its observation.
    ///
    /// Database failures and rejected statements come back as `Error: …`
    /// observations so the model can correct itself. Only language-model
    /// failures are returned as errors.
    pub async fn invoke(&self, tool_name: &str, input: &str) -> AgentResult<String> {
        let Some(tool) = SqlTool::from_name(tool_name) else {
            let names: Vec<&str> = SqlTool::ALL.iter().map(|t| t.name()).collect();
            return Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                tool_name,
                names.join(", ")
            ));
        };

        let result = match tool {
            SqlTool::ListTables => self.db.usable_table_names().await.map(|t| t.join(", ")),
            SqlTool::DescribeTables => {
                let names: Vec<String> = input
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                self.db.table_info(&names).await
            }
            SqlTool::RunQuery => self.run_query(&strip_code_fence(input)).await,
            SqlTool::CheckQuery => {
                let prompt = query_checker_prompt(self.db.dialect(), &strip_code_fence(input));
                let checked = self.llm.complete(&prompt, &[]).await?;
                Ok(strip_code_fence(&checked))
            }
        };

        match result {
            Ok(observation) => Ok(observation),
            Err(AgentError::Llm(e)) => Err(AgentError::Llm(e)),
            Err(e) => Ok(format!("Error: {}", e)),
        }
    }

    async fn run_query(&self, sql: &str) -> AgentResult<String> {
        SqlValidator::validate(sql).map_err(|e| AgentError::Database(e.to_string()))?;
        self.db.run(sql).await
    }
}

/// Removes a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let inner = if let Some(s) = trimmed.strip_prefix("```sql") {
        s
    } else if let Some(s) = trimmed.strip_prefix("```") {
        s
    } else {
        trimmed
    };
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}
