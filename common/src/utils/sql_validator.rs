//! SQL statement validator.
//!
//! The agent only ever needs to read. Every statement must start with a
//! read keyword, and statements that would modify data or schema are
//! rejected before they reach the database. Quoted literals, quoted
//! identifiers and comments are skipped, so `WHERE name = 'update'` passes.

use crate::errors::AppError;

/// Validates SQL statements produced by the agent.
pub struct SqlValidator;

/// Keywords a statement may start with.
const ALLOWED_LEADING: [&str; 6] = ["SELECT", "WITH", "EXPLAIN", "SHOW", "DESCRIBE", "DESC"];

/// Keywords that make a statement a write, wherever they appear.
const FORBIDDEN_KEYWORDS: [&str; 19] = [
    "DROP", "TRUNCATE", "DELETE", "ALTER", "INSERT", "UPDATE", "CREATE", "GRANT", "REVOKE",
    "ATTACH", "DETACH", "PRAGMA", "VACUUM", "REINDEX", "MERGE", "COPY", "INTO", "CALL", "LOCK",
];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Semicolon,
}

impl SqlValidator {
    /// Validates a SQL statement for forbidden operations.
    ///
    /// Matching is done on whole identifier-like tokens, so column names
    /// such as `updated_at` do not trip the check.
    ///
    /// # Errors
    /// Returns `AppError::UnsafeSql` naming the offending keyword.
    pub fn validate(sql: &str) -> Result<(), AppError> {
        let tokens = tokenize(sql);

        for statement in tokens.split(|t| *t == Token::Semicolon) {
            if let Some(Token::Word(lead)) = statement.first() {
                if !ALLOWED_LEADING.contains(&lead.as_str()) {
                    return Err(forbidden(lead));
                }
            }
        }

        let hit = tokens.iter().find_map(|t| match t {
            Token::Word(w) if FORBIDDEN_KEYWORDS.contains(&w.as_str()) => Some(w),
            _ => None,
        });
        match hit {
            Some(keyword) => Err(forbidden(keyword)),
            None => Ok(()),
        }
    }
}

fn forbidden(keyword: &str) -> AppError {
    AppError::UnsafeSql(format!("forbidden operation: {}", keyword))
}

/// Splits `sql` into upper-cased words and statement separators.
fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c.to_ascii_uppercase());
            continue;
        }
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(&mut word)));
        }

        match c {
            ';' => tokens.push(Token::Semicolon),
            '\'' | '"' | '`' => {
                // A doubled quote is an escaped quote inside the literal.
                while let Some(next) = chars.next() {
                    if next == c {
                        if chars.peek() == Some(&c) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => {}
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}
