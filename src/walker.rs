//! Drives a cursor-paginated collection to exhaustion.
//!
//! The walk is a lazy [`Stream`] of pages: the next page is only requested
//! once the consumer polls for it, so pages are processed strictly in cursor
//! order. The only normal termination is a page without a continuation
//! token; an empty page that still carries a token keeps the walk going.

use crate::error::{ExporterError, Result};
use crate::types::Page;
use futures::stream::{self, Stream};
use log::{debug, warn};
use std::future::Future;

enum Cursor {
    First,
    Next(String),
    Done,
}

struct WalkState<F> {
    fetch_page: F,
    cursor: Cursor,
    fetched: usize,
    max_pages: Option<usize>,
}

/// Walks pages produced by `fetch_page`, starting from no cursor.
///
/// A fetch failure is yielded once and ends the stream; pages yielded before
/// it remain valid. Hitting `max_pages` while a further cursor is pending
/// yields [`ExporterError::PageLimit`] and ends the stream.
pub fn walk<T, F, Fut>(fetch_page: F, max_pages: Option<usize>) -> impl Stream<Item = Result<Page<T>>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let state = WalkState {
        fetch_page,
        cursor: Cursor::First,
        fetched: 0,
        max_pages,
    };

    stream::unfold(state, |mut state| async move {
        let cursor = match std::mem::replace(&mut state.cursor, Cursor::Done) {
            Cursor::Done => return None,
            Cursor::First => None,
            Cursor::Next(token) => Some(token),
        };

        if let Some(limit) = state.max_pages {
            if state.fetched >= limit {
                warn!("Stopping pagination after {} pages, server still returns a cursor", limit);
                return Some((Err(ExporterError::PageLimit { limit }), state));
            }
        }

        let result = (state.fetch_page)(cursor).await;
        state.fetched += 1;

        match result {
            Ok(page) => {
                match page.next_cursor() {
                    Some(token) => {
                        state.cursor = Cursor::Next(token.to_string());
                        if state.max_pages.is_none() && state.fetched % 100 == 0 {
                            debug!("Pagination still running after {} pages", state.fetched);
                        }
                    }
                    None => debug!("Pagination finished after {} pages", state.fetched),
                }
                Some((Ok(page), state))
            }
            Err(e) => Some((Err(e), state)),
        }
    })
}
