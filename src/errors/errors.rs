//! 매핑 레이어 전역에서 사용하는 에러 시스템
//!
//! `thiserror`를 사용하여 타입 안전하고 일관된 에러 처리를 제공합니다.
//! 스토리지 엔진(드라이버) 에러는 변환하거나 삼키지 않고 그대로 전파합니다.
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use docmapper::errors::errors::{MapperError, MapperResult};
//!
//! async fn load_user(repo: &Repository<User>) -> MapperResult<User> {
//!     let user = repo.find_one_or_fail(doc! { "email": "a@b.c" }, None).await;
//!
//!     if let Err(MapperError::DocumentNotFound { ref filter, .. }) = user {
//!         // 어떤 조회가 비었는지 filter로 진단 가능
//!         log::warn!("사용자 조회 실패: {filter}");
//!     }
//!
//!     user
//! }
//! ```

use mongodb::bson::Document;
use thiserror::Error;

/// 매핑 레이어 전역 에러 타입
///
/// 설정 오류, 조회 실패, 변환 실패, 드라이버 에러를 포괄하는 열거형입니다.
#[derive(Error, Debug)]
pub enum MapperError {
    /// `*_or_fail` 계열 조회가 빈 결과를 만난 경우
    ///
    /// 어떤 엔티티의 어떤 필터가 비었는지 그대로 담아 호출자가
    /// 404 응답 등으로 변환할 수 있게 합니다.
    #[error("document not found in collection `{collection}` for filter {filter}")]
    DocumentNotFound {
        /// 엔티티 이름 (메타데이터의 `name()`)
        entity: String,
        /// 컬렉션 이름
        collection: String,
        /// 빈 결과를 만든 조회 필터
        filter: Document,
    },

    /// 리포지토리의 write-once 필드를 두 번째로 설정하려는 경우 (치명적 설정 오류)
    #[error("cannot set {what}: repository is already configured")]
    AlreadyConfigured {
        /// `"manager"` 또는 `"metadata"`
        what: &'static str,
    },

    /// 바인딩되기 전에 리포지토리 연산을 수행하려는 경우
    #[error("repository {what} is not configured")]
    NotConfigured {
        /// `"manager"` 또는 `"metadata"`
        what: &'static str,
    },

    /// 동일한 도메인 타입의 리포지토리를 같은 매니저에 중복 등록한 경우
    #[error("repository for `{entity}` is already registered")]
    AlreadyRegistered {
        /// 도메인 타입 이름
        entity: &'static str,
    },

    /// ObjectId로 정규화할 수 없는 식별자 값
    #[error("invalid document id: {0}")]
    InvalidId(String),

    /// 도메인 객체 → BSON 도큐먼트 변환 실패
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] mongodb::bson::ser::Error),

    /// BSON 도큐먼트 → 도메인 객체 변환 실패
    #[error("failed to deserialize document: {0}")]
    Deserialize(#[from] mongodb::bson::de::Error),

    /// 드라이버(스토리지 엔진) 에러. 변환 없이 그대로 전파합니다.
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// 편의성을 위한 Result 타입 별칭
pub type MapperResult<T> = Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_document_not_found_display_carries_filter() {
        let error = MapperError::DocumentNotFound {
            entity: "user".to_string(),
            collection: "users".to_string(),
            filter: doc! { "email": "a@b.c" },
        };

        let message = error.to_string();
        assert!(message.contains("users"));
        assert!(message.contains("a@b.c"));
    }

    #[test]
    fn test_already_configured_display() {
        let error = MapperError::AlreadyConfigured { what: "metadata" };
        assert_eq!(
            error.to_string(),
            "cannot set metadata: repository is already configured"
        );
    }

    #[test]
    fn test_not_configured_display() {
        let error = MapperError::NotConfigured { what: "manager" };
        assert_eq!(error.to_string(), "repository manager is not configured");
    }

    #[test]
    fn test_invalid_id_display() {
        let error = MapperError::InvalidId("not-a-hex".to_string());
        assert!(error.to_string().contains("not-a-hex"));
    }
}
