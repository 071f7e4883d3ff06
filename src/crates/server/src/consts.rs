pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";

/// 列表接口单次请求最多读取的游标页数
pub const DEFAULT_MAX_PAGES: usize = 1;
pub const MAX_PAGES_LIMIT: usize = 50;

/// 重建歌曲索引时每批读取的歌曲数
pub const REINDEX_BATCH_SIZE: u64 = 500;

/// 单次查询可请求的最大结果数，与搜索服务默认的结果窗口一致
pub const MAX_RESULT_SIZE: u32 = 10_000;
