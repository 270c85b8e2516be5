//! MongoDB-backed `CollectionStore` (§4.4).

mod bson_doc;
mod mongo;

pub use mongo::MongoCollectionStore;
