use crate::error::AppError;
use domain::value::{AlbumId, ArtistId, GenreId, UserId};
use model::document::fields;
use model::search::{BoostedField, Fuzziness, MoreLikeThis, Query};

/// 全文检索字段及权重，标题权重最高
const FREE_TEXT_FIELDS: [(&str, Option<f32>); 4] = [
    (fields::TITLE, Some(4.0)),
    (fields::ARTIST_NAME, Some(3.0)),
    (fields::GENRE_NAME, Some(2.0)),
    (fields::ALBUM_NAME, None),
];

/// 相似度推荐比较的字段
pub const SIMILARITY_FIELDS: [&str; 3] =
    [fields::ARTIST_NAME, fields::GENRE_NAME, fields::ALBUM_NAME];

/// 精选过滤条件，三组 id 之间为“或”关系
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurationFilter {
    pub artist_ids: Vec<ArtistId>,
    pub genre_ids: Vec<GenreId>,
    pub album_ids: Vec<AlbumId>,
}

impl CurationFilter {
    pub fn is_empty(&self) -> bool {
        self.artist_ids.is_empty() && self.genre_ids.is_empty() && self.album_ids.is_empty()
    }
}

/// 精选查询：匹配任意一个给定的艺术家/流派/专辑
///
/// 过滤条件全部为空时返回 `MatchNone`，而不是匹配整个曲库。
pub fn curation_query(filter: &CurationFilter) -> Query {
    if filter.is_empty() {
        return Query::MatchNone;
    }
    let should = filter
        .artist_ids
        .iter()
        .map(|id| Query::term(fields::ARTIST_ID, id.to_string()))
        .chain(
            filter
                .genre_ids
                .iter()
                .map(|id| Query::term(fields::GENRE_ID, id.to_string())),
        )
        .chain(
            filter
                .album_ids
                .iter()
                .map(|id| Query::term(fields::ALBUM_ID, id.to_string())),
        )
        .collect();
    Query::Bool {
        must: Vec::new(),
        should,
        minimum_should_match: Some(1),
    }
}

/// 带权重和容错的全文检索查询
pub fn free_text_query(text: &str) -> Result<Query, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidArgument("search query is empty".to_string()));
    }
    Ok(Query::MultiMatch {
        query: text.to_string(),
        fields: FREE_TEXT_FIELDS
            .iter()
            .map(|(field, boost)| BoostedField::new(field, *boost))
            .collect(),
        fuzziness: Some(Fuzziness::Auto),
    })
}

pub fn more_like_this_query(
    like_ids: &[String],
    min_term_freq: u32,
    stop_words: &[String],
) -> Query {
    Query::MoreLikeThis(MoreLikeThis {
        fields: SIMILARITY_FIELDS.iter().map(|f| f.to_string()).collect(),
        like_ids: like_ids.to_vec(),
        min_term_freq,
        stop_words: stop_words.to_vec(),
    })
}

/// 某个用户的全部播放列表文档
pub fn playlists_of_user_query(user_id: &UserId) -> Query {
    Query::term(fields::USER, user_id.to_string())
}
