use crate::error::{AppError, Store};
use log::{error, warn};
use model::IndexError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// 派生写入后重读关系库、确认索引已跟上现状的最大轮数
///
/// 并发请求的索引写入可能乱序落地；最后落地的写入方在重读时会发现差异并补写。
pub const MAX_CONVERGE_PASSES: u32 = 5;

/// 索引写入的有限重试策略（线性退避）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// 执行一次索引写入，可重试的错误按策略重试
///
/// 调用方必须保证关系库事务已经提交，这里只负责派生写入。
pub async fn retry_index_write<F, Fut, T>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, IndexError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                warn!(
                    "index write for {} failed (attempt {}/{}): {}",
                    what, attempt, policy.max_attempts, e
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 关系库已提交、索引未跟上时的错误，同时以 error 级别记录以便修复任务对账
pub fn partial_write_failure(entity: &str, id: &str, reason: impl Display) -> AppError {
    error!(
        "partial write: {} {} committed to {}, not applied to {}: {}",
        entity,
        id,
        Store::Relational,
        Store::SearchIndex,
        reason
    );
    AppError::PartialWriteFailure {
        entity: entity.to_string(),
        id: id.to_string(),
        committed: Store::Relational,
        pending: Store::SearchIndex,
        reason: reason.to_string(),
    }
}
