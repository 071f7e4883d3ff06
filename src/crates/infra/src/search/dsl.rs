//! 类型化查询与 Elasticsearch JSON DSL 之间的转换
//!
//! 只覆盖业务用到的子集：term / bool / multi_match / more_like_this，
//! 以及按 `_score` 求和排序的 terms 聚合。

use model::search::{
    AggregationBucket, FieldType, Fuzziness, IndexMapping, Query, ScrollPage, SearchHit,
    SearchRequest, SearchResponse,
};
use model::IndexError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// terms 聚合内部求和 `_score` 的子聚合名
pub const SCORE_AGG: &str = "total_score";

pub fn render_query(query: &Query) -> Value {
    match query {
        Query::MatchAll => json!({ "match_all": {} }),
        Query::MatchNone => json!({ "match_none": {} }),
        Query::Term { field, value } => json!({ "term": { field.as_str(): value } }),
        Query::Bool {
            must,
            should,
            minimum_should_match,
        } => {
            let mut body = Map::new();
            if !must.is_empty() {
                body.insert(
                    "must".to_string(),
                    Value::Array(must.iter().map(render_query).collect()),
                );
            }
            if !should.is_empty() {
                body.insert(
                    "should".to_string(),
                    Value::Array(should.iter().map(render_query).collect()),
                );
            }
            if let Some(n) = minimum_should_match {
                body.insert("minimum_should_match".to_string(), json!(n));
            }
            json!({ "bool": body })
        }
        Query::MultiMatch {
            query,
            fields,
            fuzziness,
        } => {
            let fields: Vec<String> = fields
                .iter()
                .map(|f| match f.boost {
                    Some(boost) => format!("{}^{}", f.field, boost),
                    None => f.field.clone(),
                })
                .collect();
            let mut body = json!({
                "query": query,
                "fields": fields,
                "type": "best_fields",
            });
            if let Some(fuzziness) = fuzziness {
                body["fuzziness"] = match fuzziness {
                    Fuzziness::Auto => json!("AUTO"),
                    Fuzziness::Distance(d) => json!(d),
                };
            }
            json!({ "multi_match": body })
        }
        Query::MoreLikeThis(mlt) => {
            let like: Vec<Value> = mlt.like_ids.iter().map(|id| json!({ "_id": id })).collect();
            let mut body = json!({
                "fields": mlt.fields,
                "like": like,
                "min_term_freq": mlt.min_term_freq,
            });
            if !mlt.stop_words.is_empty() {
                body["stop_words"] = json!(mlt.stop_words);
            }
            json!({ "more_like_this": body })
        }
    }
}

pub fn render_search(request: &SearchRequest) -> Value {
    let mut body = json!({
        "query": render_query(&request.query),
        "size": request.size,
    });
    if !request.source_includes.is_empty() {
        body["_source"] = json!(request.source_includes);
    }
    if request.explain {
        body["explain"] = json!(true);
    }
    if !request.aggregations.is_empty() {
        let mut aggs = Map::new();
        for agg in &request.aggregations {
            aggs.insert(
                agg.name.clone(),
                json!({
                    "terms": {
                        "field": agg.field,
                        "size": agg.size,
                        "order": { SCORE_AGG: "desc" },
                    },
                    "aggs": {
                        SCORE_AGG: { "sum": { "script": "_score" } }
                    }
                }),
            );
        }
        body["aggs"] = Value::Object(aggs);
    }
    body
}

pub fn render_mapping(mapping: &IndexMapping) -> Value {
    let mut properties = Map::new();
    for (name, field_type) in &mapping.properties {
        let field = match field_type {
            FieldType::Keyword => json!({ "type": "keyword" }),
            FieldType::Text => json!({ "type": "text" }),
            FieldType::TextWithKeyword => json!({
                "type": "text",
                "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
            }),
            FieldType::Float => json!({ "type": "float" }),
        };
        properties.insert(name.clone(), field);
    }
    json!({ "mappings": { "properties": properties } })
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: RawHits,
    #[serde(default)]
    aggregations: HashMap<String, RawAggregation>,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// 7.x 之后为对象，旧版本为数字
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
    #[serde(rename = "_explanation")]
    explanation: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAggregation {
    #[serde(default)]
    buckets: Vec<RawBucket>,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    key: Value,
    doc_count: u64,
    total_score: Option<RawMetric>,
}

#[derive(Debug, Deserialize)]
struct RawMetric {
    value: Option<f64>,
}

impl From<RawHit> for SearchHit {
    fn from(hit: RawHit) -> Self {
        SearchHit {
            id: hit.id,
            score: hit.score.unwrap_or(0.0),
            source: hit.source,
            explanation: hit.explanation,
        }
    }
}

impl From<RawBucket> for AggregationBucket {
    fn from(bucket: RawBucket) -> Self {
        let key = match bucket.key {
            Value::String(s) => s,
            other => other.to_string(),
        };
        AggregationBucket {
            key,
            doc_count: bucket.doc_count,
            score: bucket.total_score.and_then(|m| m.value).unwrap_or(0.0),
        }
    }
}

fn decode_response(body: Value) -> Result<RawResponse, IndexError> {
    serde_json::from_value(body)
        .map_err(|e| IndexError::Malformed(format!("unexpected search response: {}", e)))
}

pub fn parse_search_response(body: Value) -> Result<SearchResponse, IndexError> {
    let raw = decode_response(body)?;
    let hits: Vec<SearchHit> = raw.hits.hits.into_iter().map(SearchHit::from).collect();
    let total = match raw.hits.total {
        Some(RawTotal::Count(n)) | Some(RawTotal::Object { value: n }) => n,
        None => hits.len() as u64,
    };
    let aggregations = raw
        .aggregations
        .into_iter()
        .map(|(name, agg)| {
            (
                name,
                agg.buckets.into_iter().map(AggregationBucket::from).collect(),
            )
        })
        .collect();
    Ok(SearchResponse {
        total,
        hits,
        aggregations,
    })
}

pub fn parse_scroll_page(body: Value) -> Result<ScrollPage, IndexError> {
    let raw = decode_response(body)?;
    Ok(ScrollPage {
        scroll_id: raw.scroll_id,
        hits: raw.hits.hits.into_iter().map(SearchHit::from).collect(),
    })
}

/// 服务端错误体中的 `error.type`
pub fn error_type(body: &Value) -> Option<&str> {
    body.get("error")?.get("type")?.as_str()
}

fn error_reason(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("reason"))
        .and_then(|r| r.as_str())
        .map(|r| r.to_string())
        .unwrap_or_else(|| body.to_string())
}

/// 非 2xx 响应的通用归类，文档级 404 由调用方先行处理
pub fn classify_error(status: u16, body: &Value, index: &str) -> IndexError {
    if error_type(body) == Some("index_not_found_exception") {
        return IndexError::IndexMissing(index.to_string());
    }
    match status {
        429 | 500..=599 => IndexError::Unavailable(format!("{} {}", status, error_reason(body))),
        _ => IndexError::Rejected(format!("{} {}", status, error_reason(body))),
    }
}
