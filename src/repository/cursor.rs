//! 지연 변환 커서
//!
//! 드라이버 커서를 감싸 각 도큐먼트를 소비 시점에 도메인 객체로 변환합니다.
//! 결과 집합을 미리 버퍼링하지 않으므로 드라이버의 배치/스트리밍 동작이 그대로 유지됩니다.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use mongodb::Cursor;
use mongodb::bson::Document;

use crate::errors::errors::MapperResult;
use crate::metadata::DocumentMetadata;

/// 요소 단위로 도메인 변환을 수행하는 유한 전방 전용 커서
///
/// [`Stream`]으로 소비하며, 한 번 소진되면 재시작할 수 없습니다.
///
/// # Examples
///
/// ```rust,ignore
/// use futures_util::TryStreamExt;
///
/// let mut cursor = repo.find(doc! { "active": true }, None).await?;
/// while let Some(user) = cursor.try_next().await? {
///     println!("{}", user.email);
/// }
/// ```
pub struct DocumentCursor<T, M> {
    /// 드라이버 커서 (저장 형태의 도큐먼트를 생산)
    inner: Cursor<Document>,
    /// 요소 변환에 사용하는 메타데이터
    metadata: Arc<M>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, M> DocumentCursor<T, M>
where
    M: DocumentMetadata<T>,
{
    pub(crate) fn new(inner: Cursor<Document>, metadata: Arc<M>) -> Self {
        Self {
            inner,
            metadata,
            _marker: PhantomData,
        }
    }
}

impl<T, M> Stream for DocumentCursor<T, M>
where
    M: DocumentMetadata<T>,
{
    type Item = MapperResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(doc))) => Poll::Ready(Some(this.metadata.from_db(doc))),
            Poll::Ready(Some(Err(error))) => Poll::Ready(Some(Err(error.into()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
