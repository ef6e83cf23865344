//! Lazy offset/limit pagination
//!
//! Turns a "fetch one page" callback into a pull-driven [`Stream`] of items.
//! A page is only requested once every item of the previous page has been
//! consumed, so a consumer that stops early issues no further requests.

use std::future::Future;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::error::Result;
use crate::types::{Page, PageRequest};

/// Default page size for every list endpoint.
pub const PAGE_SIZE: u32 = 10_000;

/// Stream every item of an offset/limit collection.
///
/// - starts at offset 0 and asks for `page_size` items per page;
/// - follows the server-supplied `next_offset`;
/// - ends after the first page whose `count` is below `page_size` (even zero);
/// - on a fetch failure yields the error as the last element.
///
/// ```rust
/// use dns_orchestrator_sync::{Page, paginate};
/// use futures::TryStreamExt;
///
/// # async fn demo() -> dns_orchestrator_sync::Result<()> {
/// let numbers: Vec<u32> = paginate(2, |page| async move {
///     let items: Vec<u32> = (page.offset..5).take(page.limit as usize).collect();
///     let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
///     Ok(Page { items, count, next_offset: page.offset + count })
/// })
/// .try_collect()
/// .await?;
/// assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
/// # Ok(())
/// # }
/// ```
pub fn paginate<T, F, Fut>(page_size: u32, fetch: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let page_size = page_size.max(1);

    stream::unfold(
        (fetch, Some(0_u32)),
        move |(mut fetch, offset)| async move {
            let offset = offset?;
            let request = PageRequest {
                offset,
                limit: page_size,
            };

            match fetch(request).await {
                Ok(page) => {
                    log::debug!(
                        "Fetched page at offset {offset}: {} item(s), next offset {}",
                        page.count,
                        page.next_offset
                    );
                    let next = (page.count >= page_size).then_some(page.next_offset);
                    let items: Vec<Result<T>> = page.items.into_iter().map(Ok).collect();
                    Some((items, (fetch, next)))
                }
                Err(e) => Some((vec![Err(e)], (fetch, None))),
            }
        },
    )
    .flat_map(stream::iter)
}

/// Drain a paginated stream, stopping at the first error.
pub async fn collect_all<T, S>(pages: S) -> Result<Vec<T>>
where
    S: Stream<Item = Result<T>>,
{
    pages.try_collect().await
}
