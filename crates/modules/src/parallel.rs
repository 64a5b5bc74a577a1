//! Bounded-parallelism fan-out shared by modules with no true batch
//! endpoint (SMS, push, and SES email): spec §4.4 "dispatch with up to
//! `maxParallel` concurrent requests".

use {
    crate::DispatchResult,
    futures::{
        future::BoxFuture,
        stream::{self, StreamExt},
    },
    model::RecipientId,
};

pub async fn dispatch<T, F>(
    items: &[(RecipientId, T)],
    max_parallel: usize,
    call: F,
) -> crate::Result<Vec<DispatchResult>>
where
    F: for<'a> Fn(&'a (RecipientId, T)) -> BoxFuture<'a, (bool, Option<String>, Option<String>)>,
{
    let max_parallel = max_parallel.max(1);
    let results = stream::iter(items)
        .map(|item| {
            let call = &call;
            async move {
                let (success, provider_message_id, error) = call(item).await;
                DispatchResult {
                    recipient_id: item.0,
                    success,
                    provider_message_id,
                    error,
                }
            }
        })
        .buffer_unordered(max_parallel)
        .collect()
        .await;
    Ok(results)
}
