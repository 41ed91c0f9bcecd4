//! Backup export and import
//!
//! A backup is one JSON document with every collection, the program text,
//! a format version and the export time. Records keep their store ids so
//! that a restore reproduces the same identities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    EntityKind, Event, Member, NewEvent, NewMember, NewPrayerRequest, NewVisitor,
    PrayerRequest, ProgramDocument, Record, RecordId, Visitor, PROGRAM_COLLECTION, PROGRAM_KEY,
};
use crate::store::{CollectionSnapshot, StoreError, StoreResult, StoredDocument};

/// Format version written into every backup
pub const BACKUP_VERSION: &str = "1.0";

/// One record in a backup: the id next to the record's fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord<D> {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: D,
}

impl<D> BackupRecord<D> {
    fn from_record<R: Record<Draft = D>>(record: &R) -> Self {
        let (id, fields) = record.clone().into_parts();
        Self { id, fields }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default)]
    pub members: Vec<BackupRecord<NewMember>>,
    #[serde(default)]
    pub visitors: Vec<BackupRecord<NewVisitor>>,
    #[serde(default)]
    pub events: Vec<BackupRecord<NewEvent>>,
    #[serde(default)]
    pub prayer_requests: Vec<BackupRecord<NewPrayerRequest>>,
    #[serde(default)]
    pub program_content: String,
    pub version: String,
    pub export_date: DateTime<Utc>,
    /// Which deployment produced the backup
    pub source: String,
}

impl Backup {
    /// Build a backup from the snapshots currently held
    pub fn from_snapshots(
        members: &[Member],
        visitors: &[Visitor],
        events: &[Event],
        prayer_requests: &[PrayerRequest],
        program_content: &str,
        source: &str,
        export_date: DateTime<Utc>,
    ) -> Self {
        Self {
            members: members.iter().map(BackupRecord::from_record).collect(),
            visitors: visitors.iter().map(BackupRecord::from_record).collect(),
            events: events.iter().map(BackupRecord::from_record).collect(),
            prayer_requests: prayer_requests
                .iter()
                .map(BackupRecord::from_record)
                .collect(),
            program_content: program_content.to_string(),
            version: BACKUP_VERSION.to_string(),
            export_date,
            source: source.to_string(),
        }
    }

    /// Default download name, e.g. `congrega-backup-2024-03-10.json`
    pub fn file_name(date: NaiveDate) -> String {
        format!("congrega-backup-{}.json", date.format("%Y-%m-%d"))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether this build can restore the backup's format
    pub fn is_supported_version(&self) -> bool {
        self.version == BACKUP_VERSION
    }

    pub fn record_count(&self) -> usize {
        self.members.len() + self.visitors.len() + self.events.len() + self.prayer_requests.len()
    }

    /// Collections as stored documents, keyed by collection name
    pub fn collections(&self) -> StoreResult<Vec<(&'static str, CollectionSnapshot)>> {
        Ok(vec![
            (
                EntityKind::Members.collection(),
                to_documents(EntityKind::Members, &self.members)?,
            ),
            (
                EntityKind::Visitors.collection(),
                to_documents(EntityKind::Visitors, &self.visitors)?,
            ),
            (
                EntityKind::Events.collection(),
                to_documents(EntityKind::Events, &self.events)?,
            ),
            (
                EntityKind::PrayerRequests.collection(),
                to_documents(EntityKind::PrayerRequests, &self.prayer_requests)?,
            ),
        ])
    }

    /// The program singleton as `(collection, key, body)`
    pub fn program_document(&self) -> StoreResult<(&'static str, &'static str, Value)> {
        let body = serde_json::to_value(ProgramDocument {
            content: self.program_content.clone(),
        })
        .map_err(|source| StoreError::Decode {
            collection: PROGRAM_COLLECTION.to_string(),
            source,
        })?;
        Ok((PROGRAM_COLLECTION, PROGRAM_KEY, body))
    }
}

fn to_documents<D: Serialize>(
    kind: EntityKind,
    records: &[BackupRecord<D>],
) -> StoreResult<CollectionSnapshot> {
    records
        .iter()
        .map(|r| {
            serde_json::to_value(&r.fields)
                .map(|body| StoredDocument::new(r.id.clone(), body))
                .map_err(|source| StoreError::Decode {
                    collection: kind.collection().to_string(),
                    source,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberStatus;
    use chrono::{NaiveTime, TimeZone};
    use serde_json::json;

    fn sample() -> Backup {
        let member = Member {
            id: RecordId::from("m1"),
            name: "Ana".to_string(),
            role: "Diaconisa".to_string(),
            status: MemberStatus::Active,
            phone: "11999990000".to_string(),
            birth_date: None,
        };
        let event = Event {
            id: RecordId::from("e1"),
            name: "Culto".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            description: String::new(),
            image_data_url: None,
        };
        Backup::from_snapshots(
            &[member],
            &[],
            &[event],
            &[],
            "Domingo 18h",
            "local-backup",
            Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_backup_layout() {
        let value: Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["source"], "local-backup");
        assert_eq!(value["programContent"], "Domingo 18h");
        assert_eq!(value["prayerRequests"], json!([]));
        assert_eq!(value["members"][0]["id"], "m1");
        assert_eq!(value["members"][0]["status"], "Ativo");
        assert_eq!(value["members"][0]["birthDate"], "");
        assert_eq!(value["events"][0]["time"], "19:30");
        assert!(value["exportDate"].as_str().unwrap().starts_with("2024-03-10T12:00:00"));
    }

    #[test]
    fn test_collections_keep_ids() {
        let backup = Backup::from_json(&sample().to_json().unwrap()).unwrap();
        let collections = backup.collections().unwrap();

        let (name, members) = &collections[0];
        assert_eq!(*name, "members");
        assert_eq!(members[0].id, RecordId::from("m1"));
        assert_eq!(members[0].body["name"], "Ana");
        assert!(members[0].body.get("id").is_none());

        let (collection, key, body) = backup.program_document().unwrap();
        assert_eq!((collection, key), ("settings", "program"));
        assert_eq!(body, json!({"content": "Domingo 18h"}));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let json = r#"{
            "version": "1.0",
            "exportDate": "2024-01-01T00:00:00Z",
            "source": "cloud-backup"
        }"#;
        let backup = Backup::from_json(json).unwrap();
        assert_eq!(backup.record_count(), 0);
        assert!(backup.program_content.is_empty());
        assert!(backup.is_supported_version());
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(Backup::file_name(date), "congrega-backup-2024-03-10.json");
    }
}
