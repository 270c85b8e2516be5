//! Redis-backed `NavigationIndex` (§4.9), grounded in the cache adapter's
//! `ConnectionManager` + pipelining pattern: ten primary sorted sets (one
//! per `(SortField, SortDirection)` pair, scores pre-negated for `Desc` so
//! every read is a plain ascending `ZRANGE`/`ZRANK`), a secondary sorted set
//! per library/type scope, a summary blob per collection, and a
//! best-effort thumbnail byte cache with a 30-day TTL.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use imago_contracts::collection_store::CollectionStore;
use imago_contracts::navigation_index::NavigationIndex;
use imago_model::collection::CollectionType;
use imago_model::filter::{CollectionFilter, Pagination};
use imago_model::ids::{CollectionId, LibraryId};
use imago_model::navigation::{
    CollectionSummary, NavigationResult, SiblingsPage, SortDirection, SortField,
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{redis_err, CoreError, Result};
use crate::navigation::keys;

const THUMBNAIL_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const REBUILD_PAGE_SIZE: u64 = 500;

pub struct RedisNavigationIndex {
    conn: ConnectionManager,
    store: Arc<dyn CollectionStore>,
}

impl std::fmt::Debug for RedisNavigationIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisNavigationIndex").finish()
    }
}

impl RedisNavigationIndex {
    pub fn new(conn: ConnectionManager, store: Arc<dyn CollectionStore>) -> Self {
        RedisNavigationIndex { conn, store }
    }

    fn member(id: CollectionId) -> String {
        id.to_string()
    }

    /// Keys touched by a single summary: the 10 primary sets, up to 10
    /// library-scoped sets, up to 10 type-scoped sets, and the summary blob.
    fn keys_for(summary: &CollectionSummary) -> Vec<(SortField, SortDirection, String)> {
        let mut out = Vec::with_capacity(20);
        for field in SortField::ALL {
            for direction in [SortDirection::Asc, SortDirection::Desc] {
                out.push((field, direction, keys::primary_key(field, direction)));
                if let Some(library_id) = summary.library_id {
                    out.push((
                        field,
                        direction,
                        keys::by_library_key(library_id, field, direction),
                    ));
                }
                out.push((
                    field,
                    direction,
                    keys::by_type_key(summary.collection_type, field, direction),
                ));
            }
        }
        out
    }

    async fn write_summary(&self, summary: &CollectionSummary) -> Result<()> {
        let mut conn = self.conn.clone();
        let member = Self::member(summary.id);
        let blob = serde_json::to_string(summary)
            .map_err(|e| CoreError::Internal(format!("summary encode failed: {e}")))?;

        let mut pipe = redis::pipe();
        for (field, direction, key) in Self::keys_for(summary) {
            let score = summary.score_for(field) * direction.sign();
            pipe.zadd(key, member.clone(), score).ignore();
        }
        pipe.set(keys::summary_key(summary.id), blob).ignore();
        pipe.query_async::<()>(&mut conn).await.map_err(redis_err)?;
        Ok(())
    }

    async fn read_summary(&self, id: CollectionId) -> Result<Option<CollectionSummary>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(keys::summary_key(id)).await.map_err(redis_err)?;
        match raw {
            Some(s) => {
                let summary = serde_json::from_str(&s)
                    .map_err(|e| CoreError::Internal(format!("summary decode failed: {e}")))?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    async fn read_summaries(&self, ids: &[String]) -> Result<Vec<CollectionSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let data_keys: Vec<String> = ids
            .iter()
            .map(|id| format!("{}:{}", keys::DATA_PREFIX, id))
            .collect();
        let raw: Vec<Option<String>> = conn.mget(data_keys).await.map_err(redis_err)?;
        Ok(raw
            .into_iter()
            .flatten()
            .filter_map(|s| serde_json::from_str(&s).ok())
            .collect())
    }

    async fn page_from(
        &self,
        key: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<CollectionSummary>, u64)> {
        let mut conn = self.conn.clone();
        let total: u64 = conn.zcard(key).await.map_err(redis_err)?;
        let page = page.max(1);
        let start = (page - 1) * page_size;
        let stop = start.saturating_add(page_size).saturating_sub(1);
        let members: Vec<String> = conn
            .zrange(key, start as isize, stop as isize)
            .await
            .map_err(redis_err)?;
        Ok((self.read_summaries(&members).await?, total))
    }
}

#[async_trait]
impl NavigationIndex for RedisNavigationIndex {
    async fn rebuild(&self) -> Result<u64> {
        let mut conn = self.conn.clone();

        for prefix in [keys::SORTED_PREFIX, keys::DATA_PREFIX] {
            let pattern = format!("{prefix}:*");
            let mut iter: redis::AsyncIter<String> = conn
                .scan_match(pattern)
                .await
                .map_err(redis_err)?;
            let mut stale = Vec::new();
            while let Some(key) = iter.next().await {
                stale.push(key);
            }
            drop(iter);
            if !stale.is_empty() {
                let _: () = conn.del(stale).await.map_err(redis_err)?;
            }
        }

        let mut total: u64 = 0;
        let filter = CollectionFilter::default();
        let mut page = 1;
        loop {
            let pagination = Pagination {
                page,
                page_size: REBUILD_PAGE_SIZE,
                sort_by: SortField::UpdatedAt,
                sort_direction: SortDirection::Asc,
            };
            let mut stream = self.store.query(filter.clone(), pagination);
            let mut count_this_page = 0u64;
            while let Some(item) = stream.next().await {
                let collection = item?;
                let summary = CollectionSummary::from_collection(&collection);
                self.write_summary(&summary).await?;
                total += 1;
                count_this_page += 1;
            }
            drop(stream);
            if count_this_page < REBUILD_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut pipe = redis::pipe();
        pipe.set(keys::META_LAST_REBUILD, now).ignore();
        pipe.set(keys::META_TOTAL, total).ignore();
        pipe.query_async::<()>(&mut conn).await.map_err(redis_err)?;

        Ok(total)
    }

    async fn upsert(&self, summary: &CollectionSummary) -> Result<()> {
        if let Some(previous) = self.read_summary(summary.id).await? {
            if previous.library_id != summary.library_id
                || previous.collection_type != summary.collection_type
            {
                self.remove(summary.id).await?;
            }
        }
        self.write_summary(summary).await
    }

    async fn remove(&self, id: CollectionId) -> Result<()> {
        let Some(summary) = self.read_summary(id).await? else {
            return Ok(());
        };
        let mut conn = self.conn.clone();
        let member = Self::member(id);
        let mut pipe = redis::pipe();
        for (_, _, key) in Self::keys_for(&summary) {
            pipe.zrem(key, member.clone()).ignore();
        }
        pipe.del(keys::summary_key(id)).ignore();
        pipe.query_async::<()>(&mut conn).await.map_err(redis_err)?;
        Ok(())
    }

    async fn get_navigation(
        &self,
        id: CollectionId,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Option<NavigationResult>> {
        let Some(_summary) = self.read_summary(id).await? else {
            return Ok(None);
        };
        let mut conn = self.conn.clone();
        let key = keys::primary_key(sort_by, direction);
        let member = Self::member(id);

        let rank: Option<u64> = conn.zrank(&key, &member).await.map_err(redis_err)?;
        let Some(rank) = rank else {
            return Ok(None);
        };
        let total: u64 = conn.zcard(&key).await.map_err(redis_err)?;

        if total <= 1 {
            return Ok(Some(NavigationResult {
                prev: None,
                next: None,
                position: 1,
                total,
                has_previous: false,
                has_next: false,
            }));
        }

        let prev = if rank > 0 {
            let members: Vec<String> = conn
                .zrange(&key, (rank - 1) as isize, (rank - 1) as isize)
                .await
                .map_err(redis_err)?;
            members.first().and_then(|m| m.parse().ok())
        } else {
            None
        };
        let next = if rank + 1 < total {
            let members: Vec<String> = conn
                .zrange(&key, (rank + 1) as isize, (rank + 1) as isize)
                .await
                .map_err(redis_err)?;
            members.first().and_then(|m| m.parse().ok())
        } else {
            None
        };

        Ok(Some(NavigationResult {
            prev,
            next,
            position: rank + 1,
            total,
            has_previous: rank > 0,
            has_next: rank + 1 < total,
        }))
    }

    async fn get_siblings(
        &self,
        id: CollectionId,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Option<SiblingsPage>> {
        if self.read_summary(id).await?.is_none() {
            return Ok(None);
        }
        let mut conn = self.conn.clone();
        let key = keys::primary_key(sort_by, direction);
        let member = Self::member(id);

        let rank: Option<u64> = conn.zrank(&key, &member).await.map_err(redis_err)?;
        let Some(rank) = rank else {
            return Ok(None);
        };

        let page_size = page_size.max(1);
        let current_position = rank + 1;
        // A request for page 1 is resolved relative to the current
        // collection's own rank, not the literal first page, so the caller
        // lands on the page that actually contains `id`.
        let effective_page = if page <= 1 {
            (current_position / page_size) + 1
        } else {
            page
        };

        let (summaries, total) = self.page_from(&key, effective_page, page_size).await?;
        let total_pages = total.div_ceil(page_size).max(1);

        Ok(Some(SiblingsPage {
            summaries,
            current_position,
            current_page: effective_page,
            page_size,
            total,
            total_pages,
        }))
    }

    async fn get_page(
        &self,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Vec<CollectionSummary>> {
        let key = keys::primary_key(sort_by, direction);
        let (summaries, _) = self.page_from(&key, page, page_size.max(1)).await?;
        Ok(summaries)
    }

    async fn get_by_library(
        &self,
        library_id: LibraryId,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Vec<CollectionSummary>> {
        let key = keys::by_library_key(library_id, sort_by, direction);
        let (summaries, _) = self.page_from(&key, page, page_size.max(1)).await?;
        Ok(summaries)
    }

    async fn get_by_type(
        &self,
        collection_type: CollectionType,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Vec<CollectionSummary>> {
        let key = keys::by_type_key(collection_type, sort_by, direction);
        let (summaries, _) = self.page_from(&key, page, page_size.max(1)).await?;
        Ok(summaries)
    }

    async fn count(&self, sort_by: SortField) -> Result<u64> {
        let mut conn = self.conn.clone();
        let key = keys::primary_key(sort_by, SortDirection::Asc);
        conn.zcard(key).await.map_err(redis_err)
    }

    async fn count_by_library(&self, library_id: LibraryId, sort_by: SortField) -> Result<u64> {
        let mut conn = self.conn.clone();
        let key = keys::by_library_key(library_id, sort_by, SortDirection::Asc);
        conn.zcard(key).await.map_err(redis_err)
    }

    async fn count_by_type(&self, collection_type: CollectionType, sort_by: SortField) -> Result<u64> {
        let mut conn = self.conn.clone();
        let key = keys::by_type_key(collection_type, sort_by, SortDirection::Asc);
        conn.zcard(key).await.map_err(redis_err)
    }

    async fn get_cached_thumbnail(&self, collection_id: CollectionId) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(keys::thumb_key(collection_id))
            .await
            .map_err(redis_err)
    }

    async fn set_cached_thumbnail(&self, collection_id: CollectionId, bytes: Vec<u8>) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(keys::thumb_key(collection_id), bytes, THUMBNAIL_TTL_SECONDS as u64)
            .await
            .map_err(redis_err)
    }

    async fn batch_cache(&self, entries: Vec<(CollectionId, Vec<u8>)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for (id, bytes) in entries {
            pipe.set_ex(keys::thumb_key(id), bytes, THUMBNAIL_TTL_SECONDS as u64)
                .ignore();
        }
        pipe.query_async::<()>(&mut conn).await.map_err(redis_err)
    }
}
