use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::error::StoreError;
use super::seed;

pub const COLLECTIONS: &[&str] = &["users", "events", "registrations"];

/// A JSON document of named record collections, optionally backed by a
/// file that is rewritten after every change.
pub struct Db {
    path: Option<PathBuf>,
    data: RwLock<Map<String, Value>>,
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn has_id(record: &Value, id: &str) -> bool {
    record
        .get("id")
        .and_then(scalar_string)
        .is_some_and(|rid| rid == id)
}

fn numeric_id(record: &Value) -> Option<u64> {
    match record.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn into_object(record: Value) -> Result<Map<String, Value>, StoreError> {
    match record {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidRecord("body must be a JSON object".into())),
    }
}

fn check_collection(name: &str) -> Result<(), StoreError> {
    if COLLECTIONS.contains(&name) {
        Ok(())
    } else {
        Err(StoreError::UnknownCollection(name.to_string()))
    }
}

fn collection<'a>(data: &'a Map<String, Value>, name: &str) -> Result<&'a Vec<Value>, StoreError> {
    check_collection(name)?;
    data.get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Corrupt(format!("collection {name} is not an array")))
}

fn collection_mut<'a>(
    data: &'a mut Map<String, Value>,
    name: &str,
) -> Result<&'a mut Vec<Value>, StoreError> {
    check_collection(name)?;
    data.get_mut(name)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| StoreError::Corrupt(format!("collection {name} is not an array")))
}

impl Db {
    /// Loads the document at `path`, seeding it first if the file does not
    /// exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let (doc, seeded) = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let doc = serde_json::from_str::<Value>(&raw)
                    .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
                (doc, false)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "data file missing, seeding");
                (seed::document()?, true)
            }
            Err(e) => return Err(e.into()),
        };

        let db = Self::from_document(doc, Some(path))?;
        if seeded {
            let data = db.data.read().await;
            db.persist(&data).await?;
            drop(data);
        }
        Ok(db)
    }

    pub fn in_memory(doc: Value) -> Result<Self, StoreError> {
        Self::from_document(doc, None)
    }

    fn from_document(doc: Value, path: Option<PathBuf>) -> Result<Self, StoreError> {
        let Value::Object(mut data) = doc else {
            return Err(StoreError::Corrupt("top level must be a JSON object".into()));
        };
        for name in COLLECTIONS {
            let entry = data
                .entry(name.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                return Err(StoreError::Corrupt(format!("collection {name} is not an array")));
            }
        }
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    async fn persist(&self, data: &Map<String, Value>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(data)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Applies `change` to a copy of collection `name`. The copy replaces the
    /// live document only once it has been persisted, so a failed write
    /// leaves readers on the previous state.
    async fn write<T>(
        &self,
        name: &str,
        change: impl FnOnce(&mut Vec<Value>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let out = change(collection_mut(&mut next, name)?)?;
        self.persist(&next).await?;
        *data = next;
        Ok(out)
    }

    pub async fn snapshot(&self) -> Value {
        Value::Object(self.data.read().await.clone())
    }

    /// Records whose fields equal every filter value. Keys starting with `_`
    /// are reserved and ignored.
    pub async fn list(
        &self,
        name: &str,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<Value>, StoreError> {
        let data = self.data.read().await;
        let records = collection(&data, name)?;
        Ok(records
            .iter()
            .filter(|record| {
                filters
                    .iter()
                    .filter(|(key, _)| !key.starts_with('_'))
                    .all(|(key, expected)| {
                        record
                            .get(key)
                            .and_then(scalar_string)
                            .is_some_and(|actual| &actual == expected)
                    })
            })
            .cloned()
            .collect())
    }

    pub async fn get(&self, name: &str, id: &str) -> Result<Value, StoreError> {
        let data = self.data.read().await;
        collection(&data, name)?
            .iter()
            .find(|r| has_id(r, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(name, id))
    }

    /// Appends a record. A missing id is assigned as one past the largest
    /// numeric id in the collection.
    pub async fn insert(&self, name: &str, record: Value) -> Result<Value, StoreError> {
        let mut record = into_object(record)?;
        self.write(name, |records| {
            match record.get("id").filter(|id| !id.is_null()) {
                Some(id) => {
                    let id = scalar_string(id)
                        .ok_or_else(|| StoreError::InvalidRecord("id must be a scalar".into()))?;
                    if records.iter().any(|r| has_id(r, &id)) {
                        return Err(StoreError::DuplicateId {
                            collection: name.to_string(),
                            id,
                        });
                    }
                }
                None => {
                    let next = records.iter().filter_map(numeric_id).max().unwrap_or(0) + 1;
                    record.insert("id".into(), Value::from(next));
                }
            }

            let record = Value::Object(record);
            records.push(record.clone());
            Ok(record)
        })
        .await
    }

    pub async fn replace(&self, name: &str, id: &str, record: Value) -> Result<Value, StoreError> {
        let mut record = into_object(record)?;
        self.write(name, |records| {
            let slot = records
                .iter_mut()
                .find(|r| has_id(r, id))
                .ok_or_else(|| StoreError::not_found(name, id))?;

            if let Some(original_id) = slot.get("id").cloned() {
                record.insert("id".into(), original_id);
            }
            *slot = Value::Object(record);
            Ok(slot.clone())
        })
        .await
    }

    /// Merges top-level fields into the record. The id never changes.
    pub async fn patch(&self, name: &str, id: &str, changes: Value) -> Result<Value, StoreError> {
        let changes = into_object(changes)?;
        self.write(name, |records| {
            let slot = records
                .iter_mut()
                .find(|r| has_id(r, id))
                .ok_or_else(|| StoreError::not_found(name, id))?;

            if let Value::Object(fields) = slot {
                for (key, value) in changes {
                    if key != "id" {
                        fields.insert(key, value);
                    }
                }
            }
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete(&self, name: &str, id: &str) -> Result<Value, StoreError> {
        self.write(name, |records| {
            let index = records
                .iter()
                .position(|r| has_id(r, id))
                .ok_or_else(|| StoreError::not_found(name, id))?;
            Ok(records.remove(index))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn db() -> Db {
        Db::in_memory(json!({
            "registrations": [
                { "id": 1, "userId": 2, "eventId": 5, "status": "confirmed" },
                { "id": 2, "userId": 3, "eventId": 5, "status": "confirmed" },
                { "id": 7, "userId": 2, "eventId": 6, "status": "confirmed" }
            ]
        }))
        .unwrap()
    }

    fn filter(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn missing_collections_start_empty() {
        let db = db();
        assert!(db.list("users", &HashMap::new()).await.unwrap().is_empty());
        assert!(matches!(
            db.list("tickets", &HashMap::new()).await,
            Err(StoreError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn filters_compare_string_forms() {
        let db = db();
        let rows = db
            .list("registrations", &filter(&[("userId", "2"), ("eventId", "5")]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 1);

        let rows = db
            .list("registrations", &filter(&[("eventId", "5"), ("_sort", "id")]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn insert_assigns_next_id_and_rejects_duplicates() {
        let db = db();
        let created = db
            .insert("registrations", json!({ "userId": 9, "eventId": 9 }))
            .await
            .unwrap();
        assert_eq!(created["id"], 8);

        let dup = db.insert("registrations", json!({ "id": 7 })).await;
        assert!(matches!(dup, Err(StoreError::DuplicateId { .. })));

        let not_object = db.insert("registrations", json!([1, 2])).await;
        assert!(matches!(not_object, Err(StoreError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn patch_merges_and_keeps_id() {
        let db = db();
        let updated = db
            .patch("registrations", "2", json!({ "id": 99, "status": "cancelled" }))
            .await
            .unwrap();
        assert_eq!(updated["id"], 2);
        assert_eq!(updated["status"], "cancelled");
        assert_eq!(updated["userId"], 3);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let db = db();
        db.delete("registrations", "7").await.unwrap();
        assert!(matches!(
            db.get("registrations", "7").await,
            Err(StoreError::RecordNotFound { .. })
        ));
        assert!(db.delete("registrations", "7").await.is_err());
    }

    #[tokio::test]
    async fn file_backed_db_persists_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        tokio::fs::write(&path, r#"{"events": []}"#).await.unwrap();

        let db = Db::open(&path).await.unwrap();
        db.insert("events", json!({ "title": "Sauna night" })).await.unwrap();

        let reopened = Db::open(&path).await.unwrap();
        let events = reopened.list("events", &HashMap::new()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"], "Sauna night");
    }

    #[tokio::test]
    async fn failed_write_leaves_the_document_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        tokio::fs::write(&path, r#"{"events": [{ "id": 1, "title": "Sauna night" }]}"#)
            .await
            .unwrap();
        let db = Db::open(&path).await.unwrap();

        // A directory where the temp file should go makes every write fail.
        tokio::fs::create_dir(path.with_extension("json.tmp")).await.unwrap();

        assert!(db.insert("events", json!({ "title": "Ice swim" })).await.is_err());
        assert!(db.patch("events", "1", json!({ "title": "Renamed" })).await.is_err());
        assert!(db.delete("events", "1").await.is_err());

        let events = db.list("events", &HashMap::new()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"], "Sauna night");
    }
}
