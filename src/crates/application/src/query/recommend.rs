use std::collections::HashSet;
use std::sync::Arc;

use super::cursor::DocumentCursor;
use super::query_builder::{more_like_this_query, playlists_of_user_query};
use crate::error::AppError;
use crate::shared::{IndexNames, SearchIndex};
use domain::catalog::CatalogRepository;
use domain::value::UserId;
use log::{debug, info};
use model::document::{fields, from_value};
use model::search::{AggregationBucket, SearchHit, SearchRequest};
use model::IndexError;
use serde::Serialize;

const TOP_ARTISTS: &str = "top_artists";
const TOP_GENRES: &str = "top_genres";
const TOP_ALBUMS: &str = "top_albums";

/// 英文停用词，不参与相似度打分
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSettings {
    /// 种子集合不超过该值时补充随机歌曲
    pub seed_threshold: usize,
    pub sample_size: u64,
    pub result_size: u32,
    pub min_term_freq: u32,
    pub stop_words: Vec<String>,
    pub bucket_size: u32,
    pub page_size: u32,
    pub scroll_keep_alive: String,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            seed_threshold: 3,
            sample_size: 10,
            result_size: 100,
            min_term_freq: 2,
            stop_words: ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            bucket_size: 10,
            page_size: 100,
            scroll_keep_alive: "1m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationBuckets {
    pub artists: Vec<AggregationBucket>,
    pub genres: Vec<AggregationBucket>,
    pub albums: Vec<AggregationBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendation {
    /// 作为参照集的歌曲 id
    pub seed: Vec<String>,
    pub songs: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<RecommendationBuckets>,
}

/// 基于用户播放列表内容相似度的歌曲推荐
pub struct SongRecommender {
    search_index: Arc<dyn SearchIndex>,
    catalog_repository: Arc<dyn CatalogRepository>,
    indices: IndexNames,
    settings: RecommendationSettings,
}

impl SongRecommender {
    pub fn new(
        search_index: Arc<dyn SearchIndex>,
        catalog_repository: Arc<dyn CatalogRepository>,
        indices: IndexNames,
        settings: RecommendationSettings,
    ) -> Self {
        Self {
            search_index,
            catalog_repository,
            indices,
            settings,
        }
    }

    pub async fn recommend(&self, user_id: i64, aggregate: bool) -> Result<Recommendation, AppError> {
        let user_id = UserId::from(user_id);
        self.require_index(&self.indices.playlists).await?;
        self.require_index(&self.indices.songs).await?;

        let seed = self.seed_set(&user_id).await?;
        if seed.is_empty() {
            info!("no seed songs for user {}, catalog is empty", user_id);
            return Ok(Recommendation {
                buckets: aggregate.then(RecommendationBuckets::default),
                ..Default::default()
            });
        }

        let query = more_like_this_query(
            &seed,
            self.settings.min_term_freq,
            &self.settings.stop_words,
        );
        let mut request = SearchRequest::new(query, self.settings.result_size);
        if aggregate {
            let size = self.settings.bucket_size;
            request = request
                .with_aggregation(TOP_ARTISTS, &keyword(fields::ARTIST_NAME), size)
                .with_aggregation(TOP_GENRES, &keyword(fields::GENRE_NAME), size)
                .with_aggregation(TOP_ALBUMS, &keyword(fields::ALBUM_NAME), size);
        }
        let mut response = self.search_index.search(&self.indices.songs, &request).await?;
        debug!(
            "recommendation for user {}: {} seed songs, {} hits",
            user_id,
            seed.len(),
            response.hits.len()
        );

        let buckets = aggregate.then(|| RecommendationBuckets {
            artists: positive_buckets(response.aggregations.remove(TOP_ARTISTS)),
            genres: positive_buckets(response.aggregations.remove(TOP_GENRES)),
            albums: positive_buckets(response.aggregations.remove(TOP_ALBUMS)),
        });
        let mut songs = response.hits;
        songs.truncate(self.settings.result_size as usize);
        Ok(Recommendation {
            seed,
            songs,
            buckets,
        })
    }

    /// 用户所有播放列表中歌曲的并集；过少时用随机歌曲补充
    pub async fn seed_set(&self, user_id: &UserId) -> Result<Vec<String>, AppError> {
        let mut cursor = DocumentCursor::new(
            self.search_index.clone(),
            &self.indices.playlists,
            SearchRequest::new(playlists_of_user_query(user_id), self.settings.page_size)
                .with_source(&[fields::SONGS]),
            &self.settings.scroll_keep_alive,
        );

        let mut seen = HashSet::new();
        let mut seed = Vec::new();
        if let Err(e) = collect_members(&mut cursor, &mut seen, &mut seed).await {
            // 中途失败时释放服务端 scroll
            cursor.reset().await;
            return Err(e);
        }

        if seed.len() <= self.settings.seed_threshold {
            let sampled = self
                .catalog_repository
                .random_song_ids(self.settings.sample_size)
                .await?;
            debug!(
                "user {} has {} seed songs, adding {} random songs",
                user_id,
                seed.len(),
                sampled.len()
            );
            for song_id in sampled {
                let song = song_id.to_string();
                if seen.insert(song.clone()) {
                    seed.push(song);
                }
            }
        }
        Ok(seed)
    }

    async fn require_index(&self, index: &str) -> Result<(), AppError> {
        if !self.search_index.exists(index).await? {
            return Err(AppError::not_found("Index", index));
        }
        Ok(())
    }
}

fn keyword(field: &str) -> String {
    format!("{}.keyword", field)
}

/// 播放列表文档的 `songs` 字段，缺失视为空列表
async fn collect_members(
    cursor: &mut DocumentCursor,
    seen: &mut HashSet<String>,
    seed: &mut Vec<String>,
) -> Result<(), AppError> {
    while let Some(page) = cursor.next_page().await? {
        for hit in &page {
            for song in member_songs(hit)? {
                if seen.insert(song.clone()) {
                    seed.push(song);
                }
            }
        }
    }
    Ok(())
}

fn member_songs(hit: &SearchHit) -> Result<Vec<String>, IndexError> {
    match hit.source.get(fields::SONGS) {
        Some(value) => from_value(value.clone()),
        None => Ok(Vec::new()),
    }
}

/// 丢弃得分之和不为正的桶，并按得分降序排列
fn positive_buckets(buckets: Option<Vec<AggregationBucket>>) -> Vec<AggregationBucket> {
    let mut buckets: Vec<AggregationBucket> = buckets
        .unwrap_or_default()
        .into_iter()
        .filter(|b| b.score > 0.0)
        .collect();
    buckets.sort_by(|a, b| b.score.total_cmp(&a.score));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use serde_json::json;

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::with_songs(&[
            (1, "One", 1, "Queen", 1, "Rock", 10, "Opera"),
            (2, "Two", 1, "Queen", 1, "Rock", 10, "Opera"),
            (3, "Three", 2, "Miles Davis", 2, "Jazz", 20, "Blue"),
            (4, "Four", 2, "Miles Davis", 2, "Jazz", 20, "Blue"),
            (5, "Five", 3, "Daft Punk", 3, "Electronic", 30, "Discovery"),
            (6, "Six", 3, "Daft Punk", 3, "Electronic", 30, "Discovery"),
            (7, "Seven", 1, "Queen", 1, "Rock", 11, "Jazz"),
        ]))
    }

    fn recommender(index: Arc<FakeSearchIndex>, catalog: Arc<InMemoryCatalog>) -> SongRecommender {
        SongRecommender::new(
            index,
            catalog,
            IndexNames::default(),
            RecommendationSettings::default(),
        )
    }

    fn put_playlist(index: &FakeSearchIndex, id: &str, user: &str, songs: &[&str]) {
        index.put(
            "playlist-info",
            id,
            json!({"id": id, "name": id, "user": user, "songs": songs}),
        );
    }

    #[tokio::test]
    async fn test_cold_start_seed_is_random_sample() {
        let catalog = catalog();
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        index.put_songs(&catalog.details());
        let recommender = recommender(index, catalog);

        let seed = recommender.seed_set(&UserId::from(42)).await.unwrap();
        // 曲库只有 7 首，少于采样数 10
        assert_eq!(seed.len(), 7);
        let unique: HashSet<&String> = seed.iter().collect();
        assert_eq!(unique.len(), 7);
    }

    #[tokio::test]
    async fn test_malformed_playlist_document_releases_scroll() {
        let catalog = catalog();
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        index.put(
            "playlist-info",
            "p1",
            json!({"id": "p1", "name": "p1", "user": "9", "songs": "1,2"}),
        );
        let recommender = recommender(index.clone(), catalog);

        let err = recommender.seed_set(&UserId::from(9)).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(index.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn test_large_seed_skips_sampling() {
        let catalog = catalog();
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        put_playlist(&index, "p1", "9", &["1", "2", "3"]);
        put_playlist(&index, "p2", "9", &["3", "4"]);
        put_playlist(&index, "p3", "8", &["5", "6"]);
        let recommender = recommender(index, catalog);

        let mut seed = recommender.seed_set(&UserId::from(9)).await.unwrap();
        seed.sort();
        assert_eq!(seed, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let catalog = catalog();
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        put_playlist(&index, "p1", "9", &["1", "2", "3"]);
        let recommender = recommender(index, catalog);

        let seed = recommender.seed_set(&UserId::from(9)).await.unwrap();
        assert_eq!(&seed[..3], &["1", "2", "3"]);
        assert_eq!(seed.len(), 7);
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_empty_result() {
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        let recommender = recommender(index.clone(), Arc::new(InMemoryCatalog::default()));

        let result = recommender.recommend(1, true).await.unwrap();
        assert!(result.seed.is_empty());
        assert!(result.songs.is_empty());
        assert_eq!(result.buckets, Some(RecommendationBuckets::default()));
        assert_eq!(index.search_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let index = Arc::new(FakeSearchIndex::default());
        let recommender = recommender(index, catalog());
        assert!(matches!(
            recommender.recommend(1, false).await,
            Err(AppError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_recommend_builds_similarity_query_with_aggregations() {
        let catalog = catalog();
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        index.put_songs(&catalog.details());
        put_playlist(&index, "p1", "9", &["1", "2", "3", "4"]);
        let recommender = recommender(index.clone(), catalog);

        let result = recommender.recommend(9, true).await.unwrap();
        assert!(!result.songs.is_empty());
        assert!(result.songs.iter().all(|h| h.score > 0.0));

        let (name, request) = index.last_search().unwrap();
        assert_eq!(name, "songs");
        assert_eq!(request.size, 100);
        let agg_fields: Vec<&str> = request.aggregations.iter().map(|a| a.field.as_str()).collect();
        assert_eq!(
            agg_fields,
            vec!["artist_name.keyword", "genre_name.keyword", "album_name.keyword"]
        );

        let buckets = result.buckets.unwrap();
        assert!(buckets.artists.iter().all(|b| b.score > 0.0));
        assert!(buckets
            .artists
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_positive_buckets_drops_non_positive_and_sorts() {
        let bucket = |key: &str, score: f64| AggregationBucket {
            key: key.to_string(),
            doc_count: 1,
            score,
        };
        let kept = positive_buckets(Some(vec![
            bucket("a", 0.5),
            bucket("b", 0.0),
            bucket("c", 2.5),
            bucket("d", -1.0),
        ]));
        let keys: Vec<&str> = kept.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a"]);
        assert!(positive_buckets(None).is_empty());
    }
}
