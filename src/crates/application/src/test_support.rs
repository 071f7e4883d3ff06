//! 单元测试用的内存仓储与搜索索引替身

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::command::shared::IdGenerator;
use crate::command::sync::RetryPolicy;
use crate::error::AppError;
use crate::shared::SearchIndex;
use async_trait::async_trait;
use domain::activity::{
    ActivityError, RatingOutcome, RatingSummary, SongRating, SongRatingRepository, SongShare,
    SongShareRepository,
};
use domain::catalog::{Album, Artist, CatalogError, CatalogRepository, Genre, Song, SongDetail};
use domain::playlist::{Playlist, PlaylistEntry, PlaylistError, PlaylistRepository};
use domain::user::{User, UserError, UserRepository};
use domain::value::{PlaylistId, PlaylistSongId, SongId, UserId};
use model::document::{to_value, SongDocument};
use model::search::{
    AggregationBucket, IndexMapping, Query, ScrollPage, SearchHit, SearchRequest, SearchResponse,
};
use model::IndexError;
use serde_json::Value;

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

pub struct SequenceIdGenerator {
    next: AtomicI64,
}

impl Default for SequenceIdGenerator {
    fn default() -> Self {
        Self {
            next: AtomicI64::new(1000),
        }
    }
}

#[async_trait]
impl IdGenerator for SequenceIdGenerator {
    async fn next_id(&self) -> Result<i64, AppError> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// 关系库替身

#[derive(Default)]
pub struct InMemoryPlaylistRepository {
    rows: Mutex<HashMap<PlaylistId, Playlist>>,
    unavailable: AtomicBool,
}

impl InMemoryPlaylistRepository {
    pub fn snapshot(&self, id: &PlaylistId) -> Option<Playlist> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PlaylistError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PlaylistError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaylistRepository for InMemoryPlaylistRepository {
    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>, PlaylistError> {
        self.check()?;
        let playlist = self.snapshot(id);
        // 读取后让出执行权，使并发请求的预检查交错发生，由写入时的唯一约束兜底
        tokio::task::yield_now().await;
        Ok(playlist)
    }

    async fn exists_by_owner_and_name(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<bool, PlaylistError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .any(|p| &p.owner_id == owner_id && p.name == name))
    }

    async fn insert(&self, playlist: &Playlist) -> Result<(), PlaylistError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows
            .values()
            .any(|p| p.owner_id == playlist.owner_id && p.name == playlist.name)
        {
            return Err(PlaylistError::DuplicateName(playlist.name.clone()));
        }
        rows.insert(playlist.id.clone(), playlist.clone());
        Ok(())
    }

    async fn delete(&self, id: &PlaylistId) -> Result<bool, PlaylistError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().remove(id).is_some())
    }

    async fn add_song(
        &self,
        entry_id: PlaylistSongId,
        id: &PlaylistId,
        song_id: &SongId,
    ) -> Result<(), PlaylistError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let playlist = rows
            .get_mut(id)
            .ok_or_else(|| PlaylistError::NotFound(id.clone()))?;
        playlist.add_entry(entry_id, song_id.clone())
    }

    async fn remove_song(&self, id: &PlaylistId, song_id: &SongId) -> Result<bool, PlaylistError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(playlist) = rows.get_mut(id) else {
            return Ok(false);
        };
        let before = playlist.entries.len();
        playlist.entries.retain(|e: &PlaylistEntry| &e.song_id != song_id);
        Ok(playlist.entries.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    songs: Vec<SongDetail>,
}

type SongRow<'a> = (i64, &'a str, i64, &'a str, i64, &'a str, i64, &'a str);

impl InMemoryCatalog {
    /// (song id, title, artist id, artist, genre id, genre, album id, album)
    pub fn with_songs(rows: &[SongRow<'_>]) -> Self {
        let mut songs: Vec<SongDetail> = rows
            .iter()
            .map(
                |&(id, title, artist_id, artist, genre_id, genre, album_id, album)| SongDetail {
                    song: Song {
                        id: id.into(),
                        title: title.to_string(),
                        artist_id: artist_id.into(),
                        genre_id: genre_id.into(),
                        album_id: album_id.into(),
                    },
                    artist: Artist {
                        id: artist_id.into(),
                        name: artist.to_string(),
                    },
                    genre: Genre {
                        id: genre_id.into(),
                        name: genre.to_string(),
                    },
                    album: Album {
                        id: album_id.into(),
                        title: album.to_string(),
                        artist_id: artist_id.into(),
                    },
                },
            )
            .collect();
        songs.sort_by(|a, b| a.song.id.cmp(&b.song.id));
        Self { songs }
    }

    pub fn details(&self) -> Vec<SongDetail> {
        self.songs.clone()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn song_exists(&self, id: &SongId) -> Result<bool, CatalogError> {
        Ok(self.songs.iter().any(|d| &d.song.id == id))
    }

    async fn find_song_detail(&self, id: &SongId) -> Result<Option<SongDetail>, CatalogError> {
        Ok(self.songs.iter().find(|d| &d.song.id == id).cloned())
    }

    /// 按 id 逆序取前 `limit` 首，足以体现“无放回抽样”的契约
    async fn random_song_ids(&self, limit: u64) -> Result<Vec<SongId>, CatalogError> {
        Ok(self
            .songs
            .iter()
            .rev()
            .take(limit as usize)
            .map(|d| d.song.id.clone())
            .collect())
    }

    async fn list_song_details(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SongDetail>, CatalogError> {
        Ok(self
            .songs
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_songs(&self) -> Result<u64, CatalogError> {
        Ok(self.songs.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn with_users(users: &[(i64, &str)]) -> Self {
        let users = users
            .iter()
            .map(|(id, name)| User::new(UserId::from(*id), name, "hash").unwrap())
            .collect();
        Self {
            users: Mutex::new(users),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.users.lock().unwrap().iter().find(|u| &u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), UserError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(UserError::UsernameTaken(user.username.clone()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn exists(&self, id: &UserId) -> Result<bool, UserError> {
        Ok(self.users.lock().unwrap().iter().any(|u| &u.id == id))
    }
}

#[derive(Default)]
pub struct InMemoryRatingRepository {
    rows: Mutex<HashMap<(UserId, SongId), SongRating>>,
}

impl InMemoryRatingRepository {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SongRatingRepository for InMemoryRatingRepository {
    async fn upsert(&self, rating: &SongRating) -> Result<RatingOutcome, ActivityError> {
        let mut rows = self.rows.lock().unwrap();
        let key = (rating.user_id.clone(), rating.song_id.clone());
        match rows.get_mut(&key) {
            Some(existing) => {
                existing.rating = rating.rating;
                existing.updated_at = rating.updated_at;
                Ok(RatingOutcome::Updated)
            }
            None => {
                rows.insert(key, rating.clone());
                Ok(RatingOutcome::Added)
            }
        }
    }

    async fn find(
        &self,
        user_id: &UserId,
        song_id: &SongId,
    ) -> Result<Option<SongRating>, ActivityError> {
        let key = (user_id.clone(), song_id.clone());
        Ok(self.rows.lock().unwrap().get(&key).cloned())
    }

    async fn summary_for_song(&self, song_id: &SongId) -> Result<RatingSummary, ActivityError> {
        let rows = self.rows.lock().unwrap();
        let ratings: Vec<i64> = rows
            .values()
            .filter(|r| &r.song_id == song_id)
            .map(|r| r.rating as i64)
            .collect();
        Ok(RatingSummary {
            count: ratings.len() as u64,
            total: ratings.iter().sum(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryShareRepository {
    rows: Mutex<Vec<SongShare>>,
}

impl InMemoryShareRepository {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SongShareRepository for InMemoryShareRepository {
    async fn append(&self, share: &SongShare) -> Result<(), ActivityError> {
        self.rows.lock().unwrap().push(share.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 搜索索引替身：文档按 id 有序存放，查询语义只实现测试需要的子集

struct OpenScroll {
    hits: Vec<SearchHit>,
    position: usize,
    page_size: usize,
}

#[derive(Default)]
struct IndexState {
    indices: BTreeMap<String, BTreeMap<String, Value>>,
    scrolls: HashMap<String, OpenScroll>,
    next_scroll: u64,
    pending_failures: VecDeque<IndexError>,
    writes: usize,
    searches: Vec<(String, SearchRequest)>,
}

impl IndexState {
    fn docs(&self, index: &str) -> Result<&BTreeMap<String, Value>, IndexError> {
        self.indices
            .get(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))
    }

    fn docs_mut(&mut self, index: &str) -> Result<&mut BTreeMap<String, Value>, IndexError> {
        self.indices
            .get_mut(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))
    }

    /// 每次写操作先消耗一个预设故障
    fn begin_write(&mut self) -> Result<(), IndexError> {
        self.writes += 1;
        match self.pending_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeSearchIndex {
    state: Mutex<IndexState>,
    write_delays: Mutex<VecDeque<Duration>>,
}

impl FakeSearchIndex {
    pub fn with_default_indices() -> Self {
        let index = Self::default();
        {
            let mut state = index.state.lock().unwrap();
            state.indices.insert("songs".to_string(), BTreeMap::new());
            state
                .indices
                .insert("playlist-info".to_string(), BTreeMap::new());
        }
        index
    }

    pub fn put(&self, index: &str, id: &str, doc: Value) {
        self.state
            .lock()
            .unwrap()
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    pub fn put_songs(&self, details: &[SongDetail]) {
        for detail in details {
            let doc = SongDocument::from_detail(detail, 0.0);
            self.put("songs", &doc.id, to_value(&doc).unwrap());
        }
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.indices.get(index).and_then(|docs| docs.get(id)).cloned()
    }

    pub fn remove_document(&self, index: &str, id: &str) {
        if let Some(docs) = self.state.lock().unwrap().indices.get_mut(index) {
            docs.remove(id);
        }
    }

    pub fn count(&self, index: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.indices.get(index).map(|docs| docs.len()).unwrap_or(0)
    }

    /// 接下来的 `times` 次写操作返回 `error`
    pub fn fail_writes(&self, times: usize, error: IndexError) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..times {
            state.pending_failures.push_back(error.clone());
        }
    }

    /// 接下来的写操作依次延迟落地；请求内容在延迟前已确定
    pub fn delay_writes(&self, delays: &[Duration]) {
        self.write_delays.lock().unwrap().extend(delays.iter().copied());
    }

    async fn pause_write(&self) {
        let delay = self.write_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().unwrap().searches.len()
    }

    pub fn last_search(&self) -> Option<(String, SearchRequest)> {
        self.state.lock().unwrap().searches.last().cloned()
    }

    pub fn open_scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls.len()
    }
}

fn field_str<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field.trim_end_matches(".keyword"))
        .and_then(|v| v.as_str())
}

fn term_matches(doc: &Value, field: &str, value: &str) -> bool {
    match doc.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value)),
        _ => false,
    }
}

fn evaluate(query: &Query, id: &str, doc: &Value, docs: &BTreeMap<String, Value>) -> Option<f64> {
    match query {
        Query::MatchAll => Some(1.0),
        Query::MatchNone => None,
        Query::Term { field, value } => term_matches(doc, field, value).then_some(1.0),
        Query::Bool {
            must,
            should,
            minimum_should_match,
        } => {
            let mut score = 0.0;
            for q in must {
                score += evaluate(q, id, doc, docs)?;
            }
            let matched: Vec<f64> = should
                .iter()
                .filter_map(|q| evaluate(q, id, doc, docs))
                .collect();
            let required = minimum_should_match
                .unwrap_or(if must.is_empty() && !should.is_empty() { 1 } else { 0 });
            if (matched.len() as u32) < required {
                return None;
            }
            Some(score + matched.iter().sum::<f64>())
        }
        Query::MultiMatch { query, fields, .. } => {
            let tokens: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();
            let score: f64 = fields
                .iter()
                .filter(|f| {
                    field_str(doc, &f.field)
                        .map(|v| v.to_lowercase())
                        .map(|v| tokens.iter().any(|t| v.contains(t.as_str())))
                        .unwrap_or(false)
                })
                .map(|f| f.boost.unwrap_or(1.0) as f64)
                .sum();
            (score > 0.0).then_some(score)
        }
        Query::MoreLikeThis(mlt) => {
            if mlt.like_ids.iter().any(|like| like == id) {
                return None;
            }
            let mut score = 0.0;
            for field in &mlt.fields {
                let Some(value) = field_str(doc, field) else {
                    continue;
                };
                let shared = mlt
                    .like_ids
                    .iter()
                    .filter_map(|like| docs.get(like))
                    .any(|like| field_str(like, field) == Some(value));
                if shared {
                    score += 1.0;
                }
            }
            (score > 0.0).then_some(score)
        }
    }
}

fn run_query(docs: &BTreeMap<String, Value>, request: &SearchRequest) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = docs
        .iter()
        .filter_map(|(id, doc)| {
            evaluate(&request.query, id, doc, docs).map(|score| SearchHit {
                id: id.clone(),
                score,
                source: project(doc, &request.source_includes),
                explanation: request
                    .explain
                    .then(|| serde_json::json!({ "value": score, "description": "fake" })),
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    hits
}

fn project(doc: &Value, includes: &[String]) -> Value {
    if includes.is_empty() {
        return doc.clone();
    }
    let mut out = serde_json::Map::new();
    for field in includes {
        if let Some(v) = doc.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    Value::Object(out)
}

fn aggregate(
    docs: &BTreeMap<String, Value>,
    hits: &[SearchHit],
    request: &SearchRequest,
) -> HashMap<String, Vec<AggregationBucket>> {
    let mut result = HashMap::new();
    for agg in &request.aggregations {
        let mut buckets: BTreeMap<String, AggregationBucket> = BTreeMap::new();
        for hit in hits {
            let Some(key) = docs.get(&hit.id).and_then(|d| field_str(d, &agg.field)) else {
                continue;
            };
            let bucket = buckets
                .entry(key.to_string())
                .or_insert_with(|| AggregationBucket {
                    key: key.to_string(),
                    doc_count: 0,
                    score: 0.0,
                });
            bucket.doc_count += 1;
            bucket.score += hit.score;
        }
        let mut buckets: Vec<AggregationBucket> = buckets.into_values().collect();
        buckets.sort_by(|a, b| b.score.total_cmp(&a.score));
        buckets.truncate(agg.size as usize);
        result.insert(agg.name.clone(), buckets);
    }
    result
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn exists(&self, index: &str) -> Result<bool, IndexError> {
        Ok(self.state.lock().unwrap().indices.contains_key(index))
    }

    async fn create(&self, index: &str, _mapping: &IndexMapping) -> Result<(), IndexError> {
        self.state
            .lock()
            .unwrap()
            .indices
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    async fn index(&self, index: &str, id: &str, doc: &Value) -> Result<(), IndexError> {
        self.pause_write().await;
        let mut state = self.state.lock().unwrap();
        state.begin_write()?;
        state
            .docs_mut(index)?
            .insert(id.to_string(), doc.clone());
        Ok(())
    }

    async fn update(&self, index: &str, id: &str, partial: &Value) -> Result<(), IndexError> {
        self.pause_write().await;
        let mut state = self.state.lock().unwrap();
        state.begin_write()?;
        let doc = state
            .docs_mut(index)?
            .get_mut(id)
            .ok_or_else(|| IndexError::DocumentNotFound {
                index: index.to_string(),
                id: id.to_string(),
            })?;
        if let (Some(target), Some(changes)) = (doc.as_object_mut(), partial.as_object()) {
            for (k, v) in changes {
                target.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<bool, IndexError> {
        self.pause_write().await;
        let mut state = self.state.lock().unwrap();
        state.begin_write()?;
        Ok(state.docs_mut(index)?.remove(id).is_some())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError> {
        let state = self.state.lock().unwrap();
        Ok(state.docs(index)?.get(id).cloned())
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, IndexError> {
        let mut state = self.state.lock().unwrap();
        state.searches.push((index.to_string(), request.clone()));
        let docs = state.docs(index)?;
        let hits = run_query(docs, request);
        let aggregations = aggregate(docs, &hits, request);
        let total = hits.len() as u64;
        let hits = hits.into_iter().take(request.size as usize).collect();
        Ok(SearchResponse {
            total,
            hits,
            aggregations,
        })
    }

    async fn open_scroll(
        &self,
        index: &str,
        request: &SearchRequest,
        _keep_alive: &str,
    ) -> Result<ScrollPage, IndexError> {
        let mut state = self.state.lock().unwrap();
        let hits = run_query(state.docs(index)?, request);
        state.next_scroll += 1;
        let scroll_id = format!("scroll-{}", state.next_scroll);
        let page_size = request.size.max(1) as usize;
        let first: Vec<SearchHit> = hits.iter().take(page_size).cloned().collect();
        state.scrolls.insert(
            scroll_id.clone(),
            OpenScroll {
                position: first.len(),
                hits,
                page_size,
            },
        );
        Ok(ScrollPage {
            scroll_id: Some(scroll_id),
            hits: first,
        })
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<ScrollPage, IndexError> {
        let mut state = self.state.lock().unwrap();
        let open = state
            .scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| IndexError::Rejected(format!("unknown scroll {}", scroll_id)))?;
        let page: Vec<SearchHit> = open
            .hits
            .iter()
            .skip(open.position)
            .take(open.page_size)
            .cloned()
            .collect();
        open.position += page.len();
        Ok(ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            hits: page,
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexError> {
        self.state.lock().unwrap().scrolls.remove(scroll_id);
        Ok(())
    }
}
