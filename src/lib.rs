//! 제네릭 도큐먼트 매핑 레이어
//!
//! MongoDB 컬렉션 위에서 동작하는 범용 도큐먼트 매핑(ODM 스타일) 라이브러리입니다.
//! 도메인 타입과 저장 도큐먼트 사이의 변환을 메타데이터가 전담하고,
//! 리포지토리는 변환 경계를 거쳐 CRUD 연산을 스토리지 엔진에 위임합니다.
//!
//! # Features
//!
//! - **메타데이터 기반 변환**: 도메인 객체 생성, BSON 직렬화/역직렬화, ID 발급을
//!   [`DocumentMetadata`](metadata::DocumentMetadata)가 단일 소유
//! - **단일 바인딩**: 리포지토리의 `manager`/`metadata`는 정확히 한 번만 설정 가능
//! - **Fail-fast 조회**: `*_or_fail` 계열만 `DocumentNotFound`를 발생시키고,
//!   일반 조회는 빈 결과를 그대로 반환
//! - **지연 커서 매핑**: `find`는 드라이버 커서를 요소 단위로 변환하는
//!   [`Stream`](futures_util::Stream)을 반환
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ DocumentManager  │ ← 연결 관리 + 리포지토리 레지스트리
//! └──────────────────┘
//!          │ register
//!          ▼
//! ┌──────────────────┐      ┌──────────────────┐
//! │ Repository<T, M> │ ───▶ │ DocumentMetadata │ ← 변환 / ID 발급
//! └──────────────────┘      └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ MongoDB (driver) │ ← 저장소
//! └──────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use docmapper::manager::DocumentManager;
//! use docmapper::metadata::CollectionMetadata;
//! use mongodb::bson::doc;
//!
//! let manager = DocumentManager::connect().await?;
//! let metadata = CollectionMetadata::<User>::new(manager.database(), "user", "users");
//! let repo = manager.register(metadata)?;
//!
//! let user = repo.create_one(doc! { "name": "a" }, None).await?;
//! let found = repo.find_by_id_or_fail(user.id.unwrap()).await?;
//! ```

pub mod errors;
pub mod manager;
pub mod metadata;
pub mod repository;

pub use errors::errors::{MapperError, MapperResult};
pub use manager::DocumentManager;
pub use metadata::{CollectionMetadata, DocumentMetadata};
pub use repository::cursor::DocumentCursor;
pub use repository::{CreateInput, Created, Repository};
