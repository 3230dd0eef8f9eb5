use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use futures_util::future::join_all;

/// Fetch each distinct id once, all concurrently.
///
/// Cost scales with the number of distinct ids, not with the length of
/// `ids`. Every distinct id gets its own result; one failure does not
/// affect the others.
pub async fn batch_fetch<I, S, F, Fut, V, E>(ids: I, fetch: F) -> BTreeMap<String, Result<V, E>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    let distinct: BTreeSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();

    let lookups = distinct.into_iter().map(|id| {
        let pending = fetch(id.clone());
        async move { (id, pending.await) }
    });

    join_all(lookups).await.into_iter().collect()
}
