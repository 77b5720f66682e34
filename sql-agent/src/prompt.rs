//! Prompt templates.

use crate::database::Dialect;
use crate::toolkit::SqlTool;

const PREFIX: &str = "You are an agent that answers questions by querying a {dialect} database.
Given a question, write a syntactically correct {dialect} query, run it, look at the result and answer the question.
Unless the question asks for a specific number of examples, limit every query to at most {top_k} rows.
Order results by a relevant column so the most interesting rows come first.
Select only the columns relevant to the question, never every column of a table.
Use the tools below to inspect the database. Base your answer only on what the tools return.
Check your query with check_query before running it. If running it fails, rewrite it and try again.
Never issue statements that modify the database (INSERT, UPDATE, DELETE, DROP and the like).
If the question is unrelated to the database, answer \"I don't know\".";

const FORMAT_INSTRUCTIONS: &str = "Use the following format:

Question: the question you must answer
Thought: what you should do next
Action: the action to take, one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (Thought/Action/Action Input/Observation can repeat)
Thought: I now know the final answer
Final Answer: the final answer to the question";

const SUFFIX: &str = "Begin!

Question: {input}
Thought: I should look at the tables in the database to see what I can query. Then I should describe the most relevant tables.
";

/// Reply prefixes that end a model turn; the runtime supplies observations.
pub const STOP_SEQUENCES: [&str; 2] = ["\nObservation:", "\n\tObservation:"];

/// Builds the fixed part of the agent prompt for one question.
pub fn agent_prompt(dialect: Dialect, top_k: usize, question: &str) -> String {
    let dialect = dialect.to_string();
    let prefix = PREFIX
        .replace("{dialect}", &dialect)
        .replace("{top_k}", &top_k.to_string());

    let tools = SqlTool::ALL
        .iter()
        .map(|t| format!("{}: {}", t.name(), t.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = SqlTool::ALL
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ");

    let format = FORMAT_INSTRUCTIONS.replace("{tool_names}", &tool_names);
    let suffix = SUFFIX.replace("{input}", question);

    format!("{prefix}\n\n{tools}\n\n{format}\n\n{suffix}")
}

/// Prompt for the query-checking tool.
pub fn query_checker_prompt(dialect: Dialect, query: &str) -> String {
    format!(
        "{query}
Double check the {dialect} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, reproduce the original query.

Output the final SQL query only.

SQL Query: "
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_prompt_names_dialect_tools_and_question() {
        let prompt = agent_prompt(Dialect::Postgres, 5, "Who spent the most?");
        assert!(prompt.contains("querying a PostgreSQL database"));
        assert!(prompt.contains("at most 5 rows"));
        assert!(prompt.contains("one of [list_tables, describe_tables, run_query, check_query]"));
        assert!(prompt.contains("run_query: "));
        assert!(prompt.contains("Question: Who spent the most?\nThought:"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_query_checker_prompt_embeds_query() {
        let prompt = query_checker_prompt(Dialect::Sqlite, "SELECT 1");
        assert!(prompt.starts_with("SELECT 1\nDouble check the SQLite query"));
        assert!(prompt.trim_end().ends_with("SQL Query:"));
    }
}
