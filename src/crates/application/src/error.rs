use domain::activity::ActivityError;
use domain::catalog::CatalogError;
use domain::playlist::PlaylistError;
use domain::user::UserError;
use model::IndexError;
use std::fmt::{self, Display};
use thiserror::Error;

/// 双写涉及的存储
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Relational,
    SearchIndex,
}

impl Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Store::Relational => write!(f, "relational store"),
            Store::SearchIndex => write!(f, "search index"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found: {1}")]
    NotFound(String, String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// 关系库已提交，但索引写入在重试后仍失败；两个存储此时不一致
    #[error("Partial write: {entity} {id} committed to {committed}, not applied to {pending}: {reason}")]
    PartialWriteFailure {
        entity: String,
        id: String,
        committed: Store,
        pending: Store,
        reason: String,
    },
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl Display) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

impl From<PlaylistError> for AppError {
    fn from(e: PlaylistError) -> Self {
        match e {
            PlaylistError::NotFound(id) => AppError::not_found("Playlist", id),
            PlaylistError::DuplicateName(name) => {
                AppError::Conflict(format!("playlist name already used: {}", name))
            }
            e @ PlaylistError::SongAlreadyPresent { .. } => AppError::Conflict(e.to_string()),
            PlaylistError::SongNotPresent {
                playlist_id,
                song_id,
            } => AppError::NotFound(
                "Playlist entry".to_string(),
                format!("song {} in playlist {}", song_id, playlist_id),
            ),
            PlaylistError::ValidationErr(msg) => AppError::InvalidArgument(msg),
            PlaylistError::Unavailable(msg) => AppError::UpstreamUnavailable(msg),
            PlaylistError::DbErr(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::SongNotFound(id) => AppError::not_found("Song", id),
            CatalogError::Unavailable(msg) => AppError::UpstreamUnavailable(msg),
            CatalogError::DbErr(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ActivityError> for AppError {
    fn from(e: ActivityError) -> Self {
        match e {
            e @ ActivityError::RatingOutOfRange { .. } => AppError::InvalidArgument(e.to_string()),
            ActivityError::Unavailable(msg) => AppError::UpstreamUnavailable(msg),
            ActivityError::DbErr(msg) => AppError::Internal(msg),
        }
    }
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::UserNotFound(name) => AppError::not_found("User", name),
            UserError::UsernameTaken(name) => {
                AppError::Conflict(format!("username already taken: {}", name))
            }
            UserError::InvalidUser(msg) => AppError::InvalidArgument(msg),
            UserError::Unavailable(msg) => AppError::UpstreamUnavailable(msg),
            UserError::DbErr(msg) => AppError::Internal(msg),
        }
    }
}

/// 读路径上的索引错误；写路径的失败由同步协调器单独处理
impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::IndexMissing(name) => AppError::not_found("Index", name),
            IndexError::DocumentNotFound { index, id } => {
                AppError::NotFound(format!("Document in {}", index), id)
            }
            IndexError::Unavailable(msg) => AppError::UpstreamUnavailable(msg),
            IndexError::Rejected(msg) | IndexError::Malformed(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::value::{PlaylistId, SongId};

    #[test]
    fn test_playlist_errors_map_to_taxonomy() {
        let e: AppError = PlaylistError::DuplicateName("mix".to_string()).into();
        assert!(matches!(e, AppError::Conflict(_)));

        let e: AppError = PlaylistError::SongNotPresent {
            playlist_id: PlaylistId::from(1),
            song_id: SongId::from(2),
        }
        .into();
        assert!(matches!(e, AppError::NotFound(..)));

        let e: AppError = PlaylistError::Unavailable("pool timed out".to_string()).into();
        assert!(matches!(e, AppError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_missing_index_is_not_found() {
        let e: AppError = IndexError::IndexMissing("songs".to_string()).into();
        match e {
            AppError::NotFound(kind, id) => {
                assert_eq!(kind, "Index");
                assert_eq!(id, "songs");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_partial_write_message_names_both_stores() {
        let e = AppError::PartialWriteFailure {
            entity: "playlist".to_string(),
            id: "7".to_string(),
            committed: Store::Relational,
            pending: Store::SearchIndex,
            reason: "timeout".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("relational store"));
        assert!(msg.contains("search index"));
    }
}
