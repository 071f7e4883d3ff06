use crate::value::{SongId, SongRatingId, SongShareId, UserId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("Rating {value} out of range [{min}, {max}]")]
    RatingOutOfRange { value: i32, min: i32, max: i32 },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    DbErr(String),
}

/// 评分允许的闭区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRange {
    pub min: i32,
    pub max: i32,
}

impl Default for RatingRange {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl RatingRange {
    pub fn check(&self, value: i32) -> Result<i32, ActivityError> {
        if value < self.min || value > self.max {
            return Err(ActivityError::RatingOutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

/// 用户对歌曲的评分，每个 (user, song) 最多一条
#[derive(Debug, Clone, PartialEq)]
pub struct SongRating {
    pub id: SongRatingId,
    pub user_id: UserId,
    pub song_id: SongId,
    pub rating: i32,
    pub updated_at: NaiveDateTime,
}

impl SongRating {
    pub fn new(
        id: SongRatingId,
        user_id: UserId,
        song_id: SongId,
        rating: i32,
        range: &RatingRange,
    ) -> Result<Self, ActivityError> {
        Ok(Self {
            id,
            user_id,
            song_id,
            rating: range.check(rating)?,
            updated_at: Utc::now().naive_utc(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    Added,
    Updated,
}

/// 某首歌的评分汇总
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    pub count: u64,
    pub total: i64,
}

impl RatingSummary {
    /// 平均分，保留两位小数；没有评分时为 0.00
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.total as f64 / self.count as f64;
        (mean * 100.0).round() / 100.0
    }
}

/// 分享记录，只追加
#[derive(Debug, Clone, PartialEq)]
pub struct SongShare {
    pub id: SongShareId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub song_id: SongId,
    pub shared_at: NaiveDateTime,
}

impl SongShare {
    pub fn new(id: SongShareId, from_user_id: UserId, to_user_id: UserId, song_id: SongId) -> Self {
        Self {
            id,
            from_user_id,
            to_user_id,
            song_id,
            shared_at: Utc::now().naive_utc(),
        }
    }
}

#[async_trait]
pub trait SongRatingRepository: Send + Sync {
    /// 存在则覆盖评分值，否则插入
    async fn upsert(&self, rating: &SongRating) -> Result<RatingOutcome, ActivityError>;

    async fn find(
        &self,
        user_id: &UserId,
        song_id: &SongId,
    ) -> Result<Option<SongRating>, ActivityError>;

    async fn summary_for_song(&self, song_id: &SongId) -> Result<RatingSummary, ActivityError>;
}

#[async_trait]
pub trait SongShareRepository: Send + Sync {
    async fn append(&self, share: &SongShare) -> Result<(), ActivityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_rounds_to_two_decimals() {
        assert_eq!(RatingSummary { count: 3, total: 12 }.mean(), 4.0);
        assert_eq!(RatingSummary { count: 3, total: 10 }.mean(), 3.33);
        assert_eq!(RatingSummary { count: 3, total: 11 }.mean(), 3.67);
        assert_eq!(RatingSummary::default().mean(), 0.0);
    }

    #[test]
    fn test_rating_range() {
        let range = RatingRange::default();
        assert!(range.check(1).is_ok());
        assert!(range.check(5).is_ok());
        assert!(matches!(
            range.check(0),
            Err(ActivityError::RatingOutOfRange { value: 0, .. })
        ));
        assert!(range.check(6).is_err());
    }
}
