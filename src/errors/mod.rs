//! 라이브러리 전역 에러 모듈
//!
//! [`MapperError`](errors::MapperError)와 [`MapperResult`](errors::MapperResult)를 제공합니다.

pub mod errors;
