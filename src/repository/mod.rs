//! 도큐먼트 리포지토리 구현
//!
//! 하나의 컬렉션과 하나의 도메인 타입에 대한 균일한 CRUD 파사드입니다.
//! 모든 연산은 변환 경계(메타데이터)를 거쳐 스토리지 엔진에 위임되는
//! 얇은 패스스루이며, 리포지토리 자체는 호출 간 공유되는 가변 상태를 갖지 않습니다.
//!
//! ## 특징
//!
//! - **단일 바인딩**: `manager`/`metadata`는 정확히 한 번만 설정 가능
//! - **Fail-fast 조회**: `*_or_fail` 계열만 [`MapperError::DocumentNotFound`] 발생
//! - **정직한 부분 성공**: [`create_many`](Repository::create_many)는 엔진이
//!   보고한 삽입 성공 부분집합만 반환 (재시도 없음)
//! - **네이티브 결과 패스스루**: 저수준 쓰기 연산은 드라이버 결과 객체를 그대로 반환
//!
//! ## 에러 처리
//!
//! 일반 조회(`find_one`, `find_by_id`, `find`)는 "결과 없음"에 대해
//! 에러를 내지 않고 빈 결과를 반환합니다. 드라이버 에러는 변환 없이 전파됩니다.

pub mod cursor;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::options::{
    DeleteOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions, FindOneAndUpdateOptions,
    FindOneOptions, FindOptions, InsertManyOptions, InsertOneOptions, ReplaceOptions,
    ReturnDocument, UpdateModifications, UpdateOptions,
};
use mongodb::results::{DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};
use mongodb::{Collection, Database};
use once_cell::sync::OnceCell;

use crate::errors::errors::{MapperError, MapperResult};
use crate::manager::DocumentManager;
use crate::metadata::{CollectionMetadata, DocumentMetadata};
use cursor::DocumentCursor;

/// [`Repository::create`]의 단건/벌크 입력
pub enum CreateInput<P> {
    /// 단건 속성 집합
    One(P),
    /// 벌크 속성 집합
    Many(Vec<P>),
}

impl<P> From<P> for CreateInput<P> {
    fn from(props: P) -> Self {
        Self::One(props)
    }
}

impl<P> From<Vec<P>> for CreateInput<P> {
    fn from(props: Vec<P>) -> Self {
        Self::Many(props)
    }
}

/// [`Repository::create`]의 입력 형태에 대응하는 결과
#[derive(Debug)]
pub enum Created<T> {
    /// 단건 생성 결과
    One(T),
    /// 벌크 생성 결과 (삽입에 성공한 부분집합)
    Many(Vec<T>),
}

/// find-and-modify 계열의 연산 종류
///
/// 세 호출 지점이 매치/변환 로직을 공유하도록 태그된 변형으로 디스패치합니다.
enum FindOneAnd {
    Update {
        update: UpdateModifications,
        options: FindOneAndUpdateOptions,
    },
    Replace {
        replacement: Document,
        options: FindOneAndReplaceOptions,
    },
    Delete {
        options: FindOneAndDeleteOptions,
    },
}

/// 도메인 타입 `T`에 대한 도큐먼트 리포지토리
///
/// 두 협력자를 보관합니다: 생명주기 소유자인 [`DocumentManager`]와
/// 변환/ID 발급을 담당하는 [`DocumentMetadata`].
/// 둘 다 write-once 필드로, 등록 시점에 정확히 한 번씩 바인딩되며
/// 이후에는 불변입니다. 두 번째 바인딩 시도는 값과 무관하게
/// [`MapperError::AlreadyConfigured`]로 실패합니다.
pub struct Repository<T, M: DocumentMetadata<T> = CollectionMetadata<T>> {
    /// 프로세스 전역 생명주기/레지스트리 소유자 (write-once)
    manager: OnceCell<Arc<DocumentManager>>,
    /// 변환과 ID 발급 담당 (write-once)
    metadata: OnceCell<Arc<M>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, M: DocumentMetadata<T>> Repository<T, M> {
    /// 바인딩되지 않은 리포지토리를 생성합니다.
    ///
    /// 일반적으로는 [`DocumentManager::register`]가 생성과 바인딩을 함께 수행합니다.
    pub fn new() -> Self {
        Self {
            manager: OnceCell::new(),
            metadata: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// 매니저를 바인딩합니다. 두 번째 호출은 설정 오류입니다.
    pub fn bind_manager(&self, manager: Arc<DocumentManager>) -> MapperResult<()> {
        self.manager
            .set(manager)
            .map_err(|_| MapperError::AlreadyConfigured { what: "manager" })
    }

    /// 메타데이터를 바인딩합니다. 두 번째 호출은 설정 오류입니다.
    pub fn bind_metadata(&self, metadata: Arc<M>) -> MapperResult<()> {
        self.metadata
            .set(metadata)
            .map_err(|_| MapperError::AlreadyConfigured { what: "metadata" })
    }

    /// 바인딩된 매니저를 반환합니다 (읽기 전용).
    pub fn manager(&self) -> MapperResult<&Arc<DocumentManager>> {
        self.manager
            .get()
            .ok_or(MapperError::NotConfigured { what: "manager" })
    }

    /// 바인딩된 메타데이터를 반환합니다 (읽기 전용).
    pub fn metadata(&self) -> MapperResult<&Arc<M>> {
        self.metadata
            .get()
            .ok_or(MapperError::NotConfigured { what: "metadata" })
    }

    /// 이 타입이 속한 데이터베이스 핸들을 반환합니다.
    pub fn db(&self) -> MapperResult<Database> {
        Ok(self.metadata()?.db().clone())
    }

    /// 이 타입의 컬렉션 핸들을 반환합니다.
    pub fn collection(&self) -> MapperResult<Collection<Document>> {
        Ok(self.metadata()?.collection().clone())
    }

    // -------------------------------------------------------------------------
    // 변환 경계
    // -------------------------------------------------------------------------

    /// 부분 속성 집합으로 도메인 객체를 생성합니다 (삽입 전 단계).
    pub fn init(&self, props: M::Props) -> MapperResult<T> {
        self.metadata()?.init(props)
    }

    /// 도메인 객체를 저장 형태로 변환합니다.
    pub fn to_db(&self, model: &T) -> MapperResult<Document> {
        self.metadata()?.to_db(model)
    }

    /// 저장 형태를 도메인 객체로 변환합니다.
    pub fn from_db(&self, doc: Document) -> MapperResult<T> {
        self.metadata()?.from_db(doc)
    }

    /// 원시 식별자를 정규화하거나 새로 발급합니다.
    pub fn id(&self, raw: Option<Bson>) -> MapperResult<ObjectId> {
        self.metadata()?.id(raw)
    }

    // -------------------------------------------------------------------------
    // 조회 연산
    // -------------------------------------------------------------------------

    /// 필터에 매칭되는 도큐먼트들의 지연 커서를 반환합니다.
    ///
    /// 요소 변환은 소비 시점에 건별로 수행됩니다.
    pub async fn find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> MapperResult<DocumentCursor<T, M>> {
        let cursor = self.collection()?.find(filter).with_options(options).await?;

        Ok(DocumentCursor::new(cursor, Arc::clone(self.metadata()?)))
    }

    /// 매칭되는 도큐먼트 하나를 도메인 객체로 반환합니다. 없으면 `None`입니다.
    pub async fn find_one(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> MapperResult<Option<T>> {
        let found = self
            .collection()?
            .find_one(filter)
            .with_options(options)
            .await?;

        found.map(|doc| self.from_db(doc)).transpose()
    }

    /// [`find_one`](Repository::find_one)과 같지만, 빈 결과를
    /// [`MapperError::DocumentNotFound`]로 올립니다.
    ///
    /// 이어지는 변경처럼 확정된 레코드가 필요한 호출자가 사용합니다.
    pub async fn find_one_or_fail(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> MapperResult<T> {
        let found = self.find_one(filter.clone(), options).await?;

        self.fail_if_empty(filter, found)
    }

    /// 정규화된 식별자로 필터를 구성해 [`find_one`](Repository::find_one)에 위임합니다.
    pub async fn find_by_id(&self, id: impl Into<Bson>) -> MapperResult<Option<T>> {
        let id = self.id(Some(id.into()))?;

        self.find_one(doc! { "_id": id }, None).await
    }

    /// [`find_by_id`](Repository::find_by_id)와 같지만, 빈 결과를
    /// [`MapperError::DocumentNotFound`]로 올립니다.
    pub async fn find_by_id_or_fail(&self, id: impl Into<Bson>) -> MapperResult<T> {
        let id = self.id(Some(id.into()))?;
        let filter = doc! { "_id": id };

        let found = self.find_one(filter.clone(), None).await?;

        self.fail_if_empty(filter, found)
    }

    // -------------------------------------------------------------------------
    // 생성/삽입 연산
    // -------------------------------------------------------------------------

    /// 단건/벌크 생성의 다형 진입점
    ///
    /// 입력 형태에 따라 [`create_one`](Repository::create_one) 또는
    /// [`create_many`](Repository::create_many)로 디스패치합니다.
    pub async fn create(&self, input: impl Into<CreateInput<M::Props>>) -> MapperResult<Created<T>> {
        match input.into() {
            CreateInput::One(props) => Ok(Created::One(self.create_one(props, None).await?)),
            CreateInput::Many(props) => Ok(Created::Many(self.create_many(props, None).await?)),
        }
    }

    /// 도메인 객체를 생성해 삽입하고, 생성된 (삽입 전) 인스턴스를 반환합니다.
    ///
    /// 반환값은 메모리상의 인스턴스이며 저장된 도큐먼트를 다시 읽지 않습니다.
    /// 서버 측 기본값(계산 필드 등)은 반영되지 않습니다.
    pub async fn create_one(
        &self,
        props: M::Props,
        options: Option<InsertOneOptions>,
    ) -> MapperResult<T> {
        let model = self.init(props)?;

        self.insert_one(&model, options).await?;

        Ok(model)
    }

    /// 입력마다 도메인 객체를 생성해 벌크 삽입합니다.
    ///
    /// 엔진이 보고한 삽입 성공 인덱스 집합에 해당하는 객체만,
    /// 보고된 순서대로 반환합니다. 부분 실패는 에러가 아니므로,
    /// 전량 성공이 필요한 호출자는 반환 개수를 입력 개수와 직접 비교해야 합니다.
    pub async fn create_many(
        &self,
        props: Vec<M::Props>,
        options: Option<InsertManyOptions>,
    ) -> MapperResult<Vec<T>> {
        let models = props
            .into_iter()
            .map(|p| self.init(p))
            .collect::<MapperResult<Vec<_>>>()?;

        let inserted_ids = match self.insert_many(&models, options).await {
            Ok(result) => result.inserted_ids,
            // 부분 실패: 성공한 부분집합만 정직하게 보고한다
            Err(MapperError::Driver(error)) => match error.kind.as_ref() {
                ErrorKind::InsertMany(failure) => failure.inserted_ids.clone(),
                _ => return Err(MapperError::Driver(error)),
            },
            Err(other) => return Err(other),
        };

        Ok(select_inserted(models, &inserted_ids))
    }

    /// 저수준 단건 삽입. 드라이버의 네이티브 결과를 그대로 반환합니다.
    pub async fn insert_one(
        &self,
        model: &T,
        options: Option<InsertOneOptions>,
    ) -> MapperResult<InsertOneResult> {
        let doc = self.to_db(model)?;

        Ok(self
            .collection()?
            .insert_one(doc)
            .with_options(options)
            .await?)
    }

    /// 저수준 벌크 삽입. 드라이버의 네이티브 결과를 그대로 반환합니다.
    pub async fn insert_many(
        &self,
        models: &[T],
        options: Option<InsertManyOptions>,
    ) -> MapperResult<InsertManyResult> {
        let docs = models
            .iter()
            .map(|model| self.to_db(model))
            .collect::<MapperResult<Vec<_>>>()?;

        Ok(self
            .collection()?
            .insert_many(docs)
            .with_options(options)
            .await?)
    }

    // -------------------------------------------------------------------------
    // find-and-modify 연산
    // -------------------------------------------------------------------------

    /// 원자적 조회-수정. 매칭 도큐먼트가 없으면 `None`입니다.
    ///
    /// 호출자가 `return_document`를 지정하지 않으면 수정 이후 도큐먼트를 반환합니다.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: Option<FindOneAndUpdateOptions>,
    ) -> MapperResult<Option<T>> {
        let mut options = options.unwrap_or_default();
        options.return_document.get_or_insert(ReturnDocument::After);

        self.find_one_and(
            filter,
            FindOneAnd::Update {
                update: update.into(),
                options,
            },
        )
        .await
    }

    /// 원자적 조회-치환. 치환 페이로드는 새 레코드 생성과 동일하게
    /// `init` → `to_db`로 정규화됩니다.
    ///
    /// 기존 도큐먼트를 치환할 때는 속성 집합에 해당 도큐먼트의 `_id`를
    /// 포함해야 합니다. `_id`가 없으면 메타데이터가 새 식별자를 발급하는데,
    /// 저장된 `_id`와 다른 식별자로의 치환은 서버가 거부하며
    /// 그 드라이버 에러가 그대로 전파됩니다.
    pub async fn find_one_and_replace(
        &self,
        filter: Document,
        props: M::Props,
        options: Option<FindOneAndReplaceOptions>,
    ) -> MapperResult<Option<T>> {
        let mut options = options.unwrap_or_default();
        options.return_document.get_or_insert(ReturnDocument::After);

        let replacement = self.to_db(&self.init(props)?)?;

        self.find_one_and(
            filter,
            FindOneAnd::Replace {
                replacement,
                options,
            },
        )
        .await
    }

    /// 원자적 조회-삭제. 삭제된 (삭제 전) 도큐먼트를 도메인 객체로 반환합니다.
    pub async fn find_one_and_delete(
        &self,
        filter: Document,
        options: Option<FindOneAndDeleteOptions>,
    ) -> MapperResult<Option<T>> {
        self.find_one_and(
            filter,
            FindOneAnd::Delete {
                options: options.unwrap_or_default(),
            },
        )
        .await
    }

    /// find-and-modify 공용 디스패처
    ///
    /// 세 변형의 매치/변환 로직을 한 곳에 모읍니다.
    async fn find_one_and(&self, filter: Document, op: FindOneAnd) -> MapperResult<Option<T>> {
        let collection = self.collection()?;

        let found = match op {
            FindOneAnd::Update { update, options } => {
                collection
                    .find_one_and_update(filter, update)
                    .with_options(options)
                    .await?
            }
            FindOneAnd::Replace {
                replacement,
                options,
            } => {
                collection
                    .find_one_and_replace(filter, replacement)
                    .with_options(options)
                    .await?
            }
            FindOneAnd::Delete { options } => {
                collection
                    .find_one_and_delete(filter)
                    .with_options(options)
                    .await?
            }
        };

        found.map(|doc| self.from_db(doc)).transpose()
    }

    // -------------------------------------------------------------------------
    // 갱신/삭제 연산
    // -------------------------------------------------------------------------

    /// 단건 갱신 패스스루. 드라이버의 네이티브 결과를 그대로 반환합니다.
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: Option<UpdateOptions>,
    ) -> MapperResult<UpdateResult> {
        Ok(self
            .collection()?
            .update_one(filter, update.into())
            .with_options(options)
            .await?)
    }

    /// 다건 갱신 패스스루. 드라이버의 네이티브 결과를 그대로 반환합니다.
    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: Option<UpdateOptions>,
    ) -> MapperResult<UpdateResult> {
        Ok(self
            .collection()?
            .update_many(filter, update.into())
            .with_options(options)
            .await?)
    }

    /// 단건 치환. 치환 페이로드는 `init` → `to_db`로 정규화됩니다.
    ///
    /// 기존 도큐먼트를 치환할 때는 속성 집합에 해당 도큐먼트의 `_id`를
    /// 포함해야 합니다 ([`find_one_and_replace`](Repository::find_one_and_replace) 참고).
    pub async fn replace_one(
        &self,
        filter: Document,
        props: M::Props,
        options: Option<ReplaceOptions>,
    ) -> MapperResult<UpdateResult> {
        let replacement = self.to_db(&self.init(props)?)?;

        Ok(self
            .collection()?
            .replace_one(filter, replacement)
            .with_options(options)
            .await?)
    }

    /// 단건 삭제. 정확히 1건이 삭제된 경우에만 `true`입니다.
    ///
    /// "결과 없음"은 에러가 아니라 `false`입니다.
    pub async fn delete_one(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> MapperResult<bool> {
        let result = self
            .collection()?
            .delete_one(filter)
            .with_options(options)
            .await?;

        Ok(result.deleted_count == 1)
    }

    /// 다건 삭제 패스스루. 드라이버의 네이티브 결과를 그대로 반환합니다.
    pub async fn delete_many(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> MapperResult<DeleteResult> {
        Ok(self
            .collection()?
            .delete_many(filter)
            .with_options(options)
            .await?)
    }

    // -------------------------------------------------------------------------
    // 내부 메서드
    // -------------------------------------------------------------------------

    /// "결과 없음"의 단일 체크 지점
    ///
    /// 빈 값을 어떤 엔티티의 어떤 필터가 만들었는지와 함께
    /// [`MapperError::DocumentNotFound`]로 올립니다.
    fn fail_if_empty<V>(&self, filter: Document, value: Option<V>) -> MapperResult<V> {
        match value {
            Some(value) => Ok(value),
            None => {
                let metadata = self.metadata()?;

                Err(MapperError::DocumentNotFound {
                    entity: metadata.name().to_string(),
                    collection: metadata.collection().name().to_string(),
                    filter,
                })
            }
        }
    }
}

impl<T, M: DocumentMetadata<T>> Default for Repository<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// 보고된 삽입 인덱스 집합에 해당하는 모델만 인덱스 오름차순으로 추려냅니다.
fn select_inserted<T>(models: Vec<T>, inserted_ids: &HashMap<usize, Bson>) -> Vec<T> {
    let mut indices: Vec<usize> = inserted_ids.keys().copied().collect();
    indices.sort_unstable();

    let mut slots: Vec<Option<T>> = models.into_iter().map(Some).collect();

    indices
        .into_iter()
        .filter_map(|index| slots.get_mut(index).and_then(Option::take))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::Client;
    use mongodb::bson::oid::ObjectId;
    use mongodb::options::ClientOptions;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        title: String,
    }

    async fn bound_repository() -> Arc<Repository<Note>> {
        let options = ClientOptions::parse("mongodb://localhost:27017")
            .await
            .unwrap();
        let client = Client::with_options(options).unwrap();
        let manager = Arc::new(DocumentManager::with_client(client, "docmapper_test"));

        let metadata = CollectionMetadata::<Note>::new(manager.database(), "note", "notes");

        Arc::clone(&manager).register(metadata).unwrap()
    }

    #[tokio::test]
    async fn test_binding_twice_is_a_configuration_error() {
        let repo = bound_repository().await;
        let manager = Arc::clone(repo.manager().unwrap());

        // 같은 값이라도 두 번째 바인딩은 실패해야 한다
        let err = repo.bind_manager(manager).unwrap_err();
        assert!(matches!(
            err,
            MapperError::AlreadyConfigured { what: "manager" }
        ));

        let metadata = Arc::clone(repo.metadata().unwrap());
        let err = repo.bind_metadata(metadata).unwrap_err();
        assert!(matches!(
            err,
            MapperError::AlreadyConfigured { what: "metadata" }
        ));
    }

    #[tokio::test]
    async fn test_unbound_repository_reports_not_configured() {
        let repo = Repository::<Note>::new();

        assert!(matches!(
            repo.manager().unwrap_err(),
            MapperError::NotConfigured { what: "manager" }
        ));
        assert!(matches!(
            repo.metadata().unwrap_err(),
            MapperError::NotConfigured { what: "metadata" }
        ));
        assert!(matches!(
            repo.init(doc! { "title": "a" }).unwrap_err(),
            MapperError::NotConfigured { .. }
        ));
    }

    #[tokio::test]
    async fn test_fail_if_empty_carries_the_lookup_filter() {
        let repo = bound_repository().await;
        let filter = doc! { "title": "missing" };

        let err = repo
            .fail_if_empty::<Note>(filter.clone(), None)
            .unwrap_err();

        match err {
            MapperError::DocumentNotFound {
                entity,
                collection,
                filter: reported,
            } => {
                assert_eq!(entity, "note");
                assert_eq!(collection, "notes");
                assert_eq!(reported, filter);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fail_if_empty_passes_values_through() {
        let repo = bound_repository().await;

        let note = Note {
            id: Some(ObjectId::new()),
            title: "kept".to_string(),
        };
        let value = repo
            .fail_if_empty(doc! {}, Some(note.clone()))
            .unwrap();

        assert_eq!(value, note);
    }

    #[tokio::test]
    async fn test_round_trip_through_stored_form() {
        let repo = bound_repository().await;

        let note = repo.init(doc! { "title": "round trip" }).unwrap();
        let stored = repo.to_db(&note).unwrap();
        let restored = repo.from_db(stored).unwrap();

        assert_eq!(restored, note);
    }

    #[test]
    fn test_select_inserted_keeps_reported_subset_in_order() {
        let models = vec!["a", "b", "c"];
        let mut inserted_ids = HashMap::new();
        inserted_ids.insert(2usize, Bson::ObjectId(ObjectId::new()));
        inserted_ids.insert(0usize, Bson::ObjectId(ObjectId::new()));

        let selected = select_inserted(models, &inserted_ids);

        assert_eq!(selected, vec!["a", "c"]);
    }

    #[test]
    fn test_select_inserted_ignores_out_of_range_indices() {
        let models = vec!["only"];
        let mut inserted_ids = HashMap::new();
        inserted_ids.insert(0usize, Bson::Null);
        inserted_ids.insert(9usize, Bson::Null);

        let selected = select_inserted(models, &inserted_ids);

        assert_eq!(selected, vec!["only"]);
    }

    #[test]
    fn test_create_input_dispatches_by_shape() {
        let one: CreateInput<Document> = doc! { "title": "a" }.into();
        assert!(matches!(one, CreateInput::One(_)));

        let many: CreateInput<Document> =
            vec![doc! { "title": "a" }, doc! { "title": "b" }].into();
        assert!(matches!(many, CreateInput::Many(ref props) if props.len() == 2));
    }
}
