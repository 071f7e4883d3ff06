use crate::document::from_value;
use crate::IndexError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// 索引字段类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Keyword,
    Text,
    /// 全文字段 + `.keyword` 子字段（用于聚合）
    TextWithKeyword,
    Float,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMapping {
    pub properties: Vec<(String, FieldType)>,
}

impl IndexMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.properties.push((name.to_string(), field_type));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoostedField {
    pub field: String,
    pub boost: Option<f32>,
}

impl BoostedField {
    pub fn new(field: &str, boost: Option<f32>) -> Self {
        Self {
            field: field.to_string(),
            boost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fuzziness {
    /// 由搜索服务按词长决定编辑距离
    Auto,
    Distance(u8),
}

/// 基于内容相似度的查询
#[derive(Debug, Clone, PartialEq)]
pub struct MoreLikeThis {
    pub fields: Vec<String>,
    /// 作为参照集的文档 id
    pub like_ids: Vec<String>,
    pub min_term_freq: u32,
    pub stop_words: Vec<String>,
}

/// 与具体搜索服务无关的查询树，由基础设施层渲染为服务端 DSL
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    MatchNone,
    Term {
        field: String,
        value: String,
    },
    Bool {
        must: Vec<Query>,
        should: Vec<Query>,
        minimum_should_match: Option<u32>,
    },
    MultiMatch {
        query: String,
        fields: Vec<BoostedField>,
        fuzziness: Option<Fuzziness>,
    },
    MoreLikeThis(MoreLikeThis),
}

impl Query {
    pub fn term(field: &str, value: impl Into<String>) -> Self {
        Query::Term {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn is_match_none(&self) -> bool {
        matches!(self, Query::MatchNone)
    }
}

/// 按 `_score` 求和排序的 terms 聚合
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTermsAggregation {
    pub name: String,
    pub field: String,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub size: u32,
    /// 为空时返回完整 `_source`
    pub source_includes: Vec<String>,
    pub aggregations: Vec<ScoredTermsAggregation>,
    pub explain: bool,
}

impl SearchRequest {
    pub fn new(query: Query, size: u32) -> Self {
        Self {
            query,
            size,
            source_includes: Vec::new(),
            aggregations: Vec::new(),
            explain: false,
        }
    }

    pub fn with_source(mut self, fields: &[&str]) -> Self {
        self.source_includes = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_aggregation(mut self, name: &str, field: &str, size: u32) -> Self {
        self.aggregations.push(ScoredTermsAggregation {
            name: name.to_string(),
            field: field.to_string(),
            size,
        });
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub source: Value,
    /// 相关性解释，仅在请求 explain 时存在
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Value>,
}

impl SearchHit {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, IndexError> {
        from_value(self.source.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBucket {
    pub key: String,
    pub doc_count: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
    pub aggregations: HashMap<String, Vec<AggregationBucket>>,
}

/// scroll 的一页结果；`hits` 为空表示游标已耗尽
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    pub hits: Vec<SearchHit>,
}
