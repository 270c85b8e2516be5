//! Hand-written `CollectionStore` test double shared by `orchestrator.rs`
//! and the rendition workers' tests. `CollectionStore::query` returns a
//! lifetime-parameterized `BoxStream`, which is too risky to get right via
//! generated mocks without a compiler to check the result, so these tests
//! exercise a small stub instead.

#![cfg(test)]

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use imago_contracts::collection_store::{
    AppendOutcome, CollectionPatch, CollectionStore, NewCollection,
};
use imago_contracts::error::Result;
use imago_model::collection::{CacheEmbedded, Collection, ImageEmbedded, ThumbnailEmbedded};
use imago_model::filter::{CollectionFilter, Pagination};
use imago_model::ids::CollectionId;
use parking_lot::Mutex;

#[derive(Default)]
pub struct StubCollectionStore {
    pub get_result: Mutex<Option<Collection>>,
    pub add_image_result: Mutex<Option<AppendOutcome<ImageEmbedded>>>,
    pub add_thumbnail_result: Mutex<Option<AppendOutcome<ThumbnailEmbedded>>>,
    pub add_cache_result: Mutex<Option<AppendOutcome<CacheEmbedded>>>,
    /// What `query` yields, consumed wholesale on first call.
    pub query_results: Mutex<Vec<Collection>>,
}

#[async_trait]
impl CollectionStore for StubCollectionStore {
    async fn create(&self, _spec: NewCollection) -> Result<CollectionId> {
        unimplemented!("not exercised by worker tests")
    }

    async fn get(&self, _id: CollectionId) -> Result<Option<Collection>> {
        Ok(self.get_result.lock().clone())
    }

    async fn update(&self, _id: CollectionId, _patch: CollectionPatch) -> Result<()> {
        unimplemented!("not exercised by worker tests")
    }

    async fn soft_delete(&self, _id: CollectionId) -> Result<()> {
        unimplemented!("not exercised by worker tests")
    }

    async fn atomic_add_image(
        &self,
        _id: CollectionId,
        _image: ImageEmbedded,
    ) -> Result<AppendOutcome<ImageEmbedded>> {
        Ok(self
            .add_image_result
            .lock()
            .take()
            .expect("add_image_result not set"))
    }

    async fn atomic_add_thumbnail(
        &self,
        _id: CollectionId,
        _thumbnail: ThumbnailEmbedded,
        _existing_file_present: bool,
    ) -> Result<AppendOutcome<ThumbnailEmbedded>> {
        Ok(self
            .add_thumbnail_result
            .lock()
            .take()
            .expect("add_thumbnail_result not set"))
    }

    async fn atomic_add_cache(
        &self,
        _id: CollectionId,
        _cache: CacheEmbedded,
        _existing_file_present: bool,
    ) -> Result<AppendOutcome<CacheEmbedded>> {
        Ok(self
            .add_cache_result
            .lock()
            .take()
            .expect("add_cache_result not set"))
    }

    async fn update_statistics(&self, _id: CollectionId) -> Result<()> {
        unimplemented!("not exercised by worker tests")
    }

    fn query<'a>(
        &'a self,
        _filter: CollectionFilter,
        _pagination: Pagination,
    ) -> BoxStream<'a, Result<Collection>> {
        let items = std::mem::take(&mut *self.query_results.lock());
        stream::iter(items.into_iter().map(Ok)).boxed()
    }
}
