//! 도큐먼트 메타데이터 모듈
//!
//! 도메인 타입 하나당 하나씩 존재하는 변환 전담 컴포넌트를 정의합니다.
//! 메타데이터는 도메인 객체 생성([`init`](DocumentMetadata::init)),
//! 저장 형태와의 양방향 변환([`to_db`](DocumentMetadata::to_db) /
//! [`from_db`](DocumentMetadata::from_db)), 식별자 발급([`id`](DocumentMetadata::id))을
//! 단일 소유합니다. 리포지토리는 식별자를 직접 만들지 않고 항상 메타데이터에 위임합니다.
//!
//! # Examples
//!
//! ```rust,ignore
//! use docmapper::metadata::CollectionMetadata;
//!
//! let metadata = CollectionMetadata::<User>::new(database, "user", "users");
//! let user = metadata.init(doc! { "email": "a@b.c" })?;
//! ```

use std::marker::PhantomData;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, from_document, to_document};
use mongodb::{Collection, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::errors::{MapperError, MapperResult};

/// 도메인 타입 `T`의 변환과 식별자 발급을 담당하는 메타데이터 인터페이스
///
/// 동일한 `T`의 모든 리포지토리 인스턴스가 하나의 메타데이터를 공유합니다.
/// 메타데이터는 리포지토리가 소유하지 않으며, 등록 시점에 한 번만 주입됩니다.
pub trait DocumentMetadata<T>: Send + Sync + 'static {
    /// 도메인 객체 생성에 쓰이는 부분 속성 집합 (식별자는 선택)
    type Props: Send;

    /// 진단용 엔티티 이름을 반환합니다.
    fn name(&self) -> &str;

    /// 이 타입이 저장되는 MongoDB 컬렉션 핸들을 반환합니다.
    fn collection(&self) -> &Collection<Document>;

    /// 컬렉션이 속한 데이터베이스 핸들을 반환합니다.
    fn db(&self) -> &Database;

    /// 부분 속성 집합으로부터 도메인 객체를 생성합니다.
    ///
    /// 속성에 식별자가 없으면 여기서 새 식별자를 발급합니다.
    /// 모든 삽입 연산은 이 메서드를 거칩니다.
    fn init(&self, props: Self::Props) -> MapperResult<T>;

    /// 도메인 객체를 저장 형태(BSON 도큐먼트)로 변환합니다.
    fn to_db(&self, model: &T) -> MapperResult<Document>;

    /// 저장 형태를 도메인 객체로 변환합니다.
    fn from_db(&self, doc: Document) -> MapperResult<T>;

    /// 원시 식별자 값을 `ObjectId`로 정규화하거나, 없으면 새로 발급합니다.
    fn id(&self, raw: Option<Bson>) -> MapperResult<ObjectId>;
}

/// serde 기반 기본 메타데이터 구현
///
/// `Serialize + DeserializeOwned` 도메인 타입에 대해 BSON 직렬화로
/// 양방향 변환을 수행합니다. 속성 집합은 BSON [`Document`]이며,
/// `_id`가 없는 속성에는 새 [`ObjectId`]를 발급해 넣습니다.
pub struct CollectionMetadata<T> {
    /// 진단용 엔티티 이름
    name: String,
    /// 소속 데이터베이스 핸들
    db: Database,
    /// 대상 컬렉션 핸들
    collection: Collection<Document>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CollectionMetadata<T> {
    /// 데이터베이스와 컬렉션 이름으로 메타데이터를 생성합니다.
    pub fn new(db: Database, name: impl Into<String>, collection_name: &str) -> Self {
        let collection = db.collection::<Document>(collection_name);

        Self {
            name: name.into(),
            db,
            collection,
            _marker: PhantomData,
        }
    }
}

impl<T> DocumentMetadata<T> for CollectionMetadata<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Props = Document;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    fn db(&self) -> &Database {
        &self.db
    }

    fn init(&self, mut props: Document) -> MapperResult<T> {
        // 호출자가 준 _id는 정규화해서 유지하고, 없으면 새로 발급한다
        let id = self.id(props.get("_id").cloned())?;
        props.insert("_id", id);

        Ok(from_document(props)?)
    }

    fn to_db(&self, model: &T) -> MapperResult<Document> {
        Ok(to_document(model)?)
    }

    fn from_db(&self, doc: Document) -> MapperResult<T> {
        Ok(from_document(doc)?)
    }

    fn id(&self, raw: Option<Bson>) -> MapperResult<ObjectId> {
        match raw {
            None => Ok(ObjectId::new()),
            Some(Bson::ObjectId(id)) => Ok(id),
            Some(Bson::String(hex)) => {
                ObjectId::parse_str(&hex).map_err(|_| MapperError::InvalidId(hex))
            }
            Some(other) => Err(MapperError::InvalidId(other.to_string())),
        }
    }
}
