use std::time::Duration;

use crate::store::StoreError;

/// Shared key-value storage backing the device registry and the token cache.
///
/// Values are opaque strings. A value written with a TTL disappears once the
/// TTL elapses; reads never observe an expired entry.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    type GetFut<'a>: Future<Output = Result<Option<String>, StoreError>> + Send + 'a
    where
        Self: 'a;
    type PutFut<'a>: Future<Output = Result<(), StoreError>> + Send + 'a
    where
        Self: 'a;
    type DeleteFut<'a>: Future<Output = Result<bool, StoreError>> + Send + 'a
    where
        Self: 'a;

    fn get<'a>(&'a self, key: &'a str) -> Self::GetFut<'a>;
    fn put<'a>(&'a self, key: &'a str, value: String, ttl: Option<Duration>)
    -> Self::PutFut<'a>;
    fn delete<'a>(&'a self, key: &'a str) -> Self::DeleteFut<'a>;
}
