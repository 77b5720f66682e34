//! Test doubles: a scripted language model and a SQLite fixture.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{Connection, SqliteConnection};
use tempfile::TempDir;

use crate::llm::{LanguageModel, LlmError};

/// Replays canned replies in order and records every prompt it receives.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// A model whose every call fails with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Lists tables, describes `users`, counts its rows, then answers.
    pub fn count_users_script() -> Self {
        Self::new([
            "Thought: I should look at the tables in the database.\nAction: list_tables\nAction Input: ",
            "Thought: The users table looks relevant. I should describe it.\nAction: describe_tables\nAction Input: users",
            "Thought: I can count the rows.\nAction: run_query\nAction Input: SELECT COUNT(*) FROM users",
            "Thought: I now know the final answer\nFinal Answer: There are 3 rows in the users table.",
        ])
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, _stop: &[&str]) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(message) = &self.failure {
            return Err(LlmError::Api {
                status: 429,
                message: message.clone(),
            });
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// A SQLite database file in a temporary directory.
///
/// Holds `users` (3 rows) and an empty `orders` table. The directory is
/// removed when the fixture is dropped.
pub struct SqliteFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl SqliteFixture {
    pub async fn users() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        let url = format!("sqlite://{}?mode=rwc", path.display());
        let mut conn = SqliteConnection::connect(&url).await.expect("create fixture db");
        for statement in [
            "CREATE TABLE users (id INTEGER PRIMARY KEY NOT NULL, name TEXT NOT NULL, email TEXT)",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY NOT NULL, user_id INTEGER NOT NULL, total REAL)",
            "INSERT INTO users (id, name, email) VALUES \
             (1, 'alice', 'alice@example.com'), (2, 'bob', NULL), (3, 'carol', 'carol@example.com')",
        ] {
            sqlx::query(statement)
                .execute(&mut conn)
                .await
                .expect("seed fixture db");
        }
        conn.close().await.expect("close fixture db");

        Self { _dir: dir, path }
    }

    /// SQLAlchemy-style descriptor for the fixture file.
    pub fn db_uri(&self) -> String {
        format!("sqlite:///{}", self.path.display())
    }
}
