//! 问答服务模块

use std::sync::Arc;

use common::config::AgentSettings;
use common::errors::AppResult;
use sql_agent::{LanguageModel, SqlAgent, SqlDatabase};

/// 自然语言问答服务
///
/// 每次调用都新建数据库连接与智能体，不做连接复用或答案缓存。
pub struct QueryService {
    llm: Arc<dyn LanguageModel>,
    settings: AgentSettings,
}

impl QueryService {
    /// 创建新的问答服务实例
    pub fn new(llm: Arc<dyn LanguageModel>, settings: AgentSettings) -> Self {
        Self { llm, settings }
    }

    /// 用 `db_uri` 指向的数据库回答 `query`，原样返回智能体的最终答案
    pub async fn answer(&self, db_uri: &str, query: &str) -> AppResult<String> {
        let db = SqlDatabase::connect(db_uri, self.settings.sample_rows).await?;

        let result = SqlAgent::new(&db, self.llm.as_ref(), self.settings.clone())
            .run(query)
            .await;

        // 无论成功与否都关闭连接
        db.close().await;
        Ok(result?)
    }
}
