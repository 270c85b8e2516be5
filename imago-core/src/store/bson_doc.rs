//! Bridges [`imago_model::collection::Collection`] (which names its primary
//! key `id`, matching every other aggregate in the model crate) onto
//! MongoDB's `_id` convention, so the model crate never has to know it's
//! talking to Mongo.

use bson::Document;
use imago_model::collection::Collection;

use crate::error::{CoreError, Result};

pub fn to_document(collection: &Collection) -> Result<Document> {
    let mut doc = bson::to_document(collection)
        .map_err(|e| CoreError::Internal(format!("bson encode failed: {e}")))?;
    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }
    Ok(doc)
}

pub fn from_document(mut doc: Document) -> Result<Collection> {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }
    bson::from_document(doc)
        .map_err(|e| CoreError::Internal(format!("bson decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use imago_model::collection::CollectionType;

    use super::*;

    #[test]
    fn to_document_renames_id_to_mongo_underscore_id() {
        let collection = Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        );
        let doc = to_document(&collection).unwrap();
        assert!(doc.contains_key("_id"));
        assert!(!doc.contains_key("id"));
    }

    #[test]
    fn from_document_renames_underscore_id_back_to_id_and_round_trips() {
        let original = Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        );
        let doc = to_document(&original).unwrap();
        let restored = from_document(doc).unwrap();
        assert_eq!(restored.id, original.id);
        assert_eq!(restored.name, original.name);
    }
}
