//! MongoDB-backed `CollectionStore` (§4.4). Atomicity for the embedded-array
//! appends is a filtered `update_one` (`$push` guarded by a negative
//! `$elemMatch`) plus a bounded stale-read retry loop.

use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Document};
use chrono::Utc;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use imago_contracts::collection_store::{
    AppendOutcome, CollectionPatch, CollectionStore, NewCollection,
};
use imago_model::collection::{CacheEmbedded, Collection, ImageEmbedded, ThumbnailEmbedded};
use imago_model::filter::{CollectionFilter, Pagination};
use imago_model::ids::CollectionId;
use imago_model::navigation::SortField;
use mongodb::options::FindOptions;
use mongodb::Database;
use tokio::time::sleep;
use tracing::warn;

use crate::error::{mongo_err, CoreError, Result};
use crate::store::bson_doc::{from_document, to_document};

const COLLECTION_NAME: &str = "collections";
const MAX_CAS_RETRIES: u32 = 8;

pub struct MongoCollectionStore {
    collections: mongodb::Collection<Document>,
}

impl std::fmt::Debug for MongoCollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoCollectionStore").finish()
    }
}

impl MongoCollectionStore {
    pub fn new(db: &Database) -> Self {
        MongoCollectionStore {
            collections: db.collection(COLLECTION_NAME),
        }
    }

    async fn find_raw(&self, id: CollectionId) -> Result<Option<Document>> {
        self.collections
            .find_one(doc! { "_id": id.as_opaque().as_object_id(), "deleted": false })
            .await
            .map_err(mongo_err)
    }

    fn sort_doc(sort_by: SortField, ascending: bool) -> Document {
        let field = match sort_by {
            SortField::UpdatedAt => "updated_at",
            SortField::CreatedAt => "created_at",
            SortField::Name => "name",
            SortField::ImageCount => "statistics.total_items",
            SortField::TotalSize => "statistics.total_size",
        };
        doc! { field: if ascending { 1 } else { -1 } }
    }
}

fn filter_doc(filter: &CollectionFilter) -> Document {
    let mut query = Document::new();
    if !filter.include_deleted {
        query.insert("deleted", false);
    }
    if let Some(library_id) = filter.library_id {
        query.insert("library_id", library_id.as_opaque().as_object_id());
    }
    if let Some(collection_type) = filter.collection_type {
        query.insert("collection_type", collection_type.to_string());
    }
    query
}

#[async_trait]
impl CollectionStore for MongoCollectionStore {
    async fn create(&self, spec: NewCollection) -> Result<CollectionId> {
        let existing = self
            .collections
            .find_one(doc! { "path": spec.path.to_string_lossy().into_owned(), "deleted": false })
            .await
            .map_err(mongo_err)?;
        if let Some(existing) = existing {
            let collection = from_document(existing)?;
            return Err(CoreError::Conflict(format!(
                "collection already exists at {}: {}",
                spec.path.display(),
                collection.id
            )));
        }

        let mut collection = Collection::new(
            spec.name,
            spec.path,
            spec.collection_type,
            spec.library_id,
        );
        collection.description = spec.description;

        let document = to_document(&collection)?;
        self.collections
            .insert_one(document)
            .await
            .map_err(mongo_err)?;
        Ok(collection.id)
    }

    async fn get(&self, id: CollectionId) -> Result<Option<Collection>> {
        match self.find_raw(id).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: CollectionId, patch: CollectionPatch) -> Result<()> {
        let mut set = Document::new();
        if let Some(name) = patch.name {
            set.insert("name", name);
        }
        if let Some(description) = patch.description {
            set.insert("description", description);
        }
        if let Some(library_id) = patch.library_id {
            match library_id {
                Some(library_id) => {
                    set.insert("library_id", library_id.as_opaque().as_object_id());
                }
                None => {
                    set.insert("library_id", bson::Bson::Null);
                }
            }
        }
        set.insert("updated_at", bson::DateTime::from_chrono(Utc::now()));

        let result = self
            .collections
            .update_one(
                doc! { "_id": id.as_opaque().as_object_id() },
                doc! { "$set": set },
            )
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn soft_delete(&self, id: CollectionId) -> Result<()> {
        let result = self
            .collections
            .update_one(
                doc! { "_id": id.as_opaque().as_object_id() },
                doc! { "$set": {
                    "deleted": true,
                    "updated_at": bson::DateTime::from_chrono(Utc::now()),
                } },
            )
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn atomic_add_image(
        &self,
        id: CollectionId,
        image: ImageEmbedded,
    ) -> Result<AppendOutcome<ImageEmbedded>> {
        for attempt in 0..MAX_CAS_RETRIES {
            let current = self
                .get(id)
                .await?
                .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

            if let Some(existing) =
                current.find_image(&image.filename, &image.relative_path)
            {
                return Ok(AppendOutcome {
                    added: false,
                    existing: existing.clone(),
                });
            }

            let image_doc = bson::to_bson(&image)
                .map_err(|e| CoreError::Internal(format!("bson encode failed: {e}")))?;
            let new_total_items = current.statistics.total_items + 1;
            let new_total_size = current.statistics.total_size + image.file_size;

            let result = self
                .collections
                .update_one(
                    doc! {
                        "_id": id.as_opaque().as_object_id(),
                        "images": { "$not": { "$elemMatch": {
                            "filename": &image.filename,
                            "relative_path": &image.relative_path,
                        } } },
                    },
                    doc! { "$push": { "images": image_doc },
                           "$set": {
                               "statistics.total_items": new_total_items as i64,
                               "statistics.total_size": new_total_size as i64,
                               "updated_at": bson::DateTime::from_chrono(Utc::now()),
                           } },
                )
                .await
                .map_err(mongo_err)?;

            if result.modified_count == 1 {
                return Ok(AppendOutcome {
                    added: true,
                    existing: image,
                });
            }

            warn!(attempt, "atomic_add_image CAS conflict, retrying");
            sleep(Duration::from_millis(5 * (attempt as u64 + 1))).await;
        }

        Err(CoreError::TransientIo(
            "atomic_add_image exceeded retry budget".into(),
        ))
    }

    async fn atomic_add_thumbnail(
        &self,
        id: CollectionId,
        thumbnail: ThumbnailEmbedded,
        existing_file_present: bool,
    ) -> Result<AppendOutcome<ThumbnailEmbedded>> {
        for attempt in 0..MAX_CAS_RETRIES {
            let current = self
                .get(id)
                .await?
                .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

            if let Some(existing) = current.find_thumbnail(
                thumbnail.image_id,
                thumbnail.width,
                thumbnail.height,
            ) {
                if existing_file_present {
                    return Ok(AppendOutcome {
                        added: false,
                        existing: existing.clone(),
                    });
                }
            }

            let thumb_doc = bson::to_bson(&thumbnail)
                .map_err(|e| CoreError::Internal(format!("bson encode failed: {e}")))?;

            let result = self
                .collections
                .update_one(
                    doc! {
                        "_id": id.as_opaque().as_object_id(),
                        "thumbnails": { "$not": { "$elemMatch": {
                            "image_id": thumbnail.image_id.as_opaque().as_object_id(),
                            "width": thumbnail.width as i64,
                            "height": thumbnail.height as i64,
                        } } },
                    },
                    doc! { "$push": { "thumbnails": thumb_doc },
                           "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) } },
                )
                .await
                .map_err(mongo_err)?;

            if result.modified_count == 1 {
                return Ok(AppendOutcome {
                    added: true,
                    existing: thumbnail,
                });
            }

            warn!(attempt, "atomic_add_thumbnail CAS conflict, retrying");
            sleep(Duration::from_millis(5 * (attempt as u64 + 1))).await;
        }

        Err(CoreError::TransientIo(
            "atomic_add_thumbnail exceeded retry budget".into(),
        ))
    }

    async fn atomic_add_cache(
        &self,
        id: CollectionId,
        cache: CacheEmbedded,
        existing_file_present: bool,
    ) -> Result<AppendOutcome<CacheEmbedded>> {
        for attempt in 0..MAX_CAS_RETRIES {
            let current = self
                .get(id)
                .await?
                .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

            if let Some(existing) =
                current.find_cache(cache.image_id, cache.width, cache.height)
            {
                if existing_file_present {
                    return Ok(AppendOutcome {
                        added: false,
                        existing: existing.clone(),
                    });
                }
            }

            let cache_doc = bson::to_bson(&cache)
                .map_err(|e| CoreError::Internal(format!("bson encode failed: {e}")))?;

            let result = self
                .collections
                .update_one(
                    doc! {
                        "_id": id.as_opaque().as_object_id(),
                        "cache_images": { "$not": { "$elemMatch": {
                            "image_id": cache.image_id.as_opaque().as_object_id(),
                            "width": cache.width as i64,
                            "height": cache.height as i64,
                        } } },
                    },
                    doc! { "$push": { "cache_images": cache_doc },
                           "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) } },
                )
                .await
                .map_err(mongo_err)?;

            if result.modified_count == 1 {
                return Ok(AppendOutcome {
                    added: true,
                    existing: cache,
                });
            }

            warn!(attempt, "atomic_add_cache CAS conflict, retrying");
            sleep(Duration::from_millis(5 * (attempt as u64 + 1))).await;
        }

        Err(CoreError::TransientIo(
            "atomic_add_cache exceeded retry budget".into(),
        ))
    }

    async fn update_statistics(&self, id: CollectionId) -> Result<()> {
        let collection = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let total_items = collection.images.len() as i64;
        let total_size: u64 = collection.images.iter().map(|i| i.file_size).sum();

        self.collections
            .update_one(
                doc! { "_id": id.as_opaque().as_object_id() },
                doc! { "$set": {
                    "statistics.total_items": total_items,
                    "statistics.total_size": total_size as i64,
                    "updated_at": bson::DateTime::from_chrono(Utc::now()),
                } },
            )
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    fn query<'a>(
        &'a self,
        filter: CollectionFilter,
        pagination: Pagination,
    ) -> BoxStream<'a, Result<Collection>> {
        let query = filter_doc(&filter);
        let sort = Self::sort_doc(
            pagination.sort_by,
            pagination.sort_direction == imago_model::navigation::SortDirection::Asc,
        );
        let options = FindOptions::builder()
            .sort(sort)
            .skip(pagination.skip())
            .limit(pagination.page_size as i64)
            .build();

        Box::pin(async_stream::try_stream! {
            let cursor = self
                .collections
                .find(query)
                .with_options(options)
                .await
                .map_err(mongo_err)?;
            let mut cursor = cursor.map_err(mongo_err);
            while let Some(doc) = cursor.try_next().await? {
                yield from_document(doc)?;
            }
        })
    }
}
