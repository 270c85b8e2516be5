//! MongoDB-backed `LibraryRepository` and `ScheduledJobRepository` (§3, §4.10).

use async_trait::async_trait;
use bson::{doc, Document};
use imago_contracts::repositories::{LibraryRepository, ScheduledJobRepository};
use imago_model::ids::{JobId, LibraryId};
use imago_model::library::Library;
use imago_model::scheduled_job::{JobRunStatus, ScheduledJob, ScheduledJobRun};
use mongodb::Database;

use crate::error::{mongo_err, CoreError, Result};

const LIBRARIES: &str = "libraries";
const SCHEDULED_JOBS: &str = "scheduled_jobs";
const SCHEDULED_JOB_RUNS: &str = "scheduled_job_runs";

fn to_doc<T: serde::Serialize>(value: &T, id_field: &str) -> Result<Document> {
    let mut doc = bson::to_document(value)
        .map_err(|e| CoreError::Internal(format!("bson encode failed: {e}")))?;
    if let Some(id) = doc.remove(id_field) {
        doc.insert("_id", id);
    }
    Ok(doc)
}

fn from_doc<T: serde::de::DeserializeOwned>(mut doc: Document, id_field: &str) -> Result<T> {
    if let Some(id) = doc.remove("_id") {
        doc.insert(id_field, id);
    }
    bson::from_document(doc).map_err(|e| CoreError::Internal(format!("bson decode failed: {e}")))
}

pub struct MongoLibraryRepository {
    libraries: mongodb::Collection<Document>,
}

impl std::fmt::Debug for MongoLibraryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoLibraryRepository").finish()
    }
}

impl MongoLibraryRepository {
    pub fn new(db: &Database) -> Self {
        MongoLibraryRepository {
            libraries: db.collection(LIBRARIES),
        }
    }
}

#[async_trait]
impl LibraryRepository for MongoLibraryRepository {
    async fn create(&self, library: Library) -> Result<LibraryId> {
        let doc = to_doc(&library, "id")?;
        self.libraries.insert_one(doc).await.map_err(mongo_err)?;
        Ok(library.id)
    }

    async fn get(&self, id: LibraryId) -> Result<Option<Library>> {
        let found = self
            .libraries
            .find_one(doc! { "_id": id.as_opaque().as_object_id() })
            .await
            .map_err(mongo_err)?;
        found.map(|d| from_doc(d, "id")).transpose()
    }

    async fn list(&self) -> Result<Vec<Library>> {
        use futures::TryStreamExt;
        let cursor = self.libraries.find(doc! {}).await.map_err(mongo_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(mongo_err)?;
        docs.into_iter().map(|d| from_doc(d, "id")).collect()
    }

    async fn update(&self, id: LibraryId, library: Library) -> Result<()> {
        let mut doc = to_doc(&library, "id")?;
        doc.remove("_id");
        let result = self
            .libraries
            .update_one(
                doc! { "_id": id.as_opaque().as_object_id() },
                doc! { "$set": doc },
            )
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: LibraryId) -> Result<()> {
        self.libraries
            .delete_one(doc! { "_id": id.as_opaque().as_object_id() })
            .await
            .map_err(mongo_err)?;
        Ok(())
    }
}

pub struct MongoScheduledJobRepository {
    jobs: mongodb::Collection<Document>,
    runs: mongodb::Collection<Document>,
}

impl std::fmt::Debug for MongoScheduledJobRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoScheduledJobRepository").finish()
    }
}

impl MongoScheduledJobRepository {
    pub fn new(db: &Database) -> Self {
        MongoScheduledJobRepository {
            jobs: db.collection(SCHEDULED_JOBS),
            runs: db.collection(SCHEDULED_JOB_RUNS),
        }
    }
}

#[async_trait]
impl ScheduledJobRepository for MongoScheduledJobRepository {
    async fn create(&self, job: ScheduledJob) -> Result<JobId> {
        let doc = to_doc(&job, "id")?;
        self.jobs.insert_one(doc).await.map_err(mongo_err)?;
        Ok(job.id)
    }

    async fn get(&self, id: JobId) -> Result<Option<ScheduledJob>> {
        let found = self
            .jobs
            .find_one(doc! { "_id": id.as_opaque().as_object_id() })
            .await
            .map_err(mongo_err)?;
        found.map(|d| from_doc(d, "id")).transpose()
    }

    async fn get_by_library(&self, library_id: LibraryId) -> Result<Option<ScheduledJob>> {
        let found = self
            .jobs
            .find_one(doc! { "parameters.library_id": library_id.as_opaque().as_object_id() })
            .await
            .map_err(mongo_err)?;
        found.map(|d| from_doc(d, "id")).transpose()
    }

    async fn list_enabled(&self) -> Result<Vec<ScheduledJob>> {
        use futures::TryStreamExt;
        let cursor = self
            .jobs
            .find(doc! { "is_enabled": true })
            .await
            .map_err(mongo_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(mongo_err)?;
        docs.into_iter().map(|d| from_doc(d, "id")).collect()
    }

    async fn set_enabled(&self, id: JobId, enabled: bool) -> Result<()> {
        let result = self
            .jobs
            .update_one(
                doc! { "_id": id.as_opaque().as_object_id() },
                doc! { "$set": { "is_enabled": enabled } },
            )
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: JobId) -> Result<()> {
        self.jobs
            .delete_one(doc! { "_id": id.as_opaque().as_object_id() })
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    async fn record_run(
        &self,
        id: JobId,
        status: JobRunStatus,
        duration_ms: u64,
        error_message: Option<String>,
    ) -> Result<()> {
        let now = chrono::Utc::now();
        let run = ScheduledJobRun {
            job_id: id,
            started_at: now,
            finished_at: Some(now),
            status,
            duration_ms,
            error_message: error_message.clone(),
        };
        let run_doc = bson::to_document(&run)
            .map_err(|e| CoreError::Internal(format!("bson encode failed: {e}")))?;
        self.runs.insert_one(run_doc).await.map_err(mongo_err)?;

        let status_increment = match status {
            JobRunStatus::Succeeded => doc! { "success_count": 1 },
            JobRunStatus::Failed => doc! { "failure_count": 1 },
            JobRunStatus::Running => doc! {},
        };

        let mut update = doc! {
            "$inc": { "run_count": 1 },
            "$set": {
                "last_run_at": bson::DateTime::from_chrono(now),
                "last_run_status": format!("{status:?}"),
                "last_run_duration_ms": duration_ms as i64,
                "last_error_message": error_message,
            },
        };
        if !status_increment.is_empty() {
            let inc = update.get_document_mut("$inc").unwrap();
            inc.extend(status_increment);
        }

        self.jobs
            .update_one(doc! { "_id": id.as_opaque().as_object_id() }, update)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    async fn list_runs(&self, id: JobId, limit: u64) -> Result<Vec<ScheduledJobRun>> {
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        let options = FindOptions::builder()
            .sort(doc! { "started_at": -1 })
            .limit(limit as i64)
            .build();
        let cursor = self
            .runs
            .find(doc! { "job_id": id.as_opaque().as_object_id() })
            .with_options(options)
            .await
            .map_err(mongo_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(mongo_err)?;
        docs.into_iter()
            .map(|d| {
                bson::from_document(d)
                    .map_err(|e| CoreError::Internal(format!("bson decode failed: {e}")))
            })
            .collect()
    }
}
