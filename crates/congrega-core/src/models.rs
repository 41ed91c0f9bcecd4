//! Data models for Congrega
//!
//! Defines the entities kept in the document store: Member, Visitor, Event
//! and PrayerRequest, plus the `Record` trait that lets the sync layer move
//! them in and out of raw JSON documents.
//!
//! Field names serialize in camelCase so documents written by earlier
//! deployments (and their backups) load unchanged.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Role label given to members created from a visitor conversion
pub const DEFAULT_MEMBER_ROLE: &str = "Membro";

/// Store-assigned identity of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The entity kinds held by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Members,
    Visitors,
    Events,
    PrayerRequests,
    Program,
}

impl EntityKind {
    /// All kinds, in the order subscriptions are opened
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Members,
        EntityKind::Visitors,
        EntityKind::Events,
        EntityKind::PrayerRequests,
        EntityKind::Program,
    ];

    /// Name of the backing collection in the document store
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Members => "members",
            EntityKind::Visitors => "visitors",
            EntityKind::Events => "events",
            EntityKind::PrayerRequests => "prayerRequests",
            EntityKind::Program => PROGRAM_COLLECTION,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Members => "member",
            EntityKind::Visitors => "visitor",
            EntityKind::Events => "event",
            EntityKind::PrayerRequests => "prayer request",
            EntityKind::Program => "program",
        };
        f.write_str(name)
    }
}

/// Collection holding the singleton program document
pub const PROGRAM_COLLECTION: &str = "settings";
/// Key of the singleton program document
pub const PROGRAM_KEY: &str = "program";

/// A collection-backed entity
///
/// `Draft` is the entity without its identity: what `add` sends and what a
/// stored document body decodes into.
pub trait Record: Clone + Send + Sync + 'static {
    type Draft: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &RecordId;

    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;

    fn into_parts(self) -> (RecordId, Self::Draft);
}

// ==================== Members ====================

/// Membership status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Inativo")]
    Inactive,
}

impl MemberStatus {
    /// Label as stored and displayed
    pub fn label(self) -> &'static str {
        match self {
            MemberStatus::Active => "Ativo",
            MemberStatus::Inactive => "Inativo",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ativo" | "active" => Ok(MemberStatus::Active),
            "inativo" | "inactive" => Ok(MemberStatus::Inactive),
            other => Err(format!("unknown member status '{}'", other)),
        }
    }
}

/// Member fields, without identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub name: String,
    /// Free-text role label ("Membro", "Diácono", ...)
    pub role: String,
    pub status: MemberStatus,
    #[serde(default)]
    pub phone: String,
    #[serde(default, with = "optional_date")]
    pub birth_date: Option<NaiveDate>,
}

impl NewMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: DEFAULT_MEMBER_ROLE.to_string(),
            status: MemberStatus::Active,
            phone: String::new(),
            birth_date: None,
        }
    }

    /// Member record built from a visitor being converted
    pub fn from_visitor(visitor: &Visitor) -> Self {
        Self {
            name: visitor.name.clone(),
            role: DEFAULT_MEMBER_ROLE.to_string(),
            status: MemberStatus::Active,
            phone: visitor.phone.clone(),
            birth_date: None,
        }
    }
}

/// A member of the congregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: RecordId,
    pub name: String,
    pub role: String,
    pub status: MemberStatus,
    pub phone: String,
    #[serde(serialize_with = "optional_date::serialize")]
    pub birth_date: Option<NaiveDate>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

impl Record for Member {
    type Draft = NewMember;

    const KIND: EntityKind = EntityKind::Members;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, d: NewMember) -> Self {
        Self {
            id,
            name: d.name,
            role: d.role,
            status: d.status,
            phone: d.phone,
            birth_date: d.birth_date,
        }
    }

    fn into_parts(self) -> (RecordId, NewMember) {
        (
            self.id,
            NewMember {
                name: self.name,
                role: self.role,
                status: self.status,
                phone: self.phone,
                birth_date: self.birth_date,
            },
        )
    }
}

// ==================== Visitors ====================

/// Visitor fields, without identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisitor {
    pub name: String,
    pub first_visit_date: NaiveDate,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

/// A visitor, pending conversion to member
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: RecordId,
    pub name: String,
    pub first_visit_date: NaiveDate,
    pub phone: String,
    pub notes: String,
}

impl Record for Visitor {
    type Draft = NewVisitor;

    const KIND: EntityKind = EntityKind::Visitors;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, d: NewVisitor) -> Self {
        Self {
            id,
            name: d.name,
            first_visit_date: d.first_visit_date,
            phone: d.phone,
            notes: d.notes,
        }
    }

    fn into_parts(self) -> (RecordId, NewVisitor) {
        (
            self.id,
            NewVisitor {
                name: self.name,
                first_visit_date: self.first_visit_date,
                phone: self.phone,
                notes: self.notes,
            },
        )
    }
}

// ==================== Events ====================

/// Event fields, without identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    #[serde(default)]
    pub description: String,
    /// Inline `data:image/...;base64,` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
}

/// A calendar event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub name: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "hour_minute::serialize")]
    pub time: NaiveTime,
    pub description: String,
    pub image_data_url: Option<String>,
}

impl Event {
    /// Combined date and time, used for ordering
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl Record for Event {
    type Draft = NewEvent;

    const KIND: EntityKind = EntityKind::Events;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, d: NewEvent) -> Self {
        Self {
            id,
            name: d.name,
            date: d.date,
            time: d.time,
            description: d.description,
            image_data_url: d.image_data_url,
        }
    }

    fn into_parts(self) -> (RecordId, NewEvent) {
        (
            self.id,
            NewEvent {
                name: self.name,
                date: self.date,
                time: self.time,
                description: self.description,
                image_data_url: self.image_data_url,
            },
        )
    }
}

// ==================== Prayer requests ====================

/// Prayer request as submitted from the form; the date is stamped on add
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerRequestForm {
    pub name: Option<String>,
    pub request: String,
    pub is_anonymous: bool,
}

/// Prayer request fields, without identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrayerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub request: String,
    #[serde(default)]
    pub is_anonymous: bool,
    pub date: NaiveDate,
}

/// A request on the public prayer board
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerRequest {
    pub id: RecordId,
    pub name: Option<String>,
    pub request: String,
    pub is_anonymous: bool,
    /// Set once at creation
    pub date: NaiveDate,
}

impl PrayerRequest {
    /// Name to show on the board
    ///
    /// Anonymous requests never show a name, whatever is stored.
    pub fn display_name(&self) -> Option<&str> {
        if self.is_anonymous {
            return None;
        }
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

impl Record for PrayerRequest {
    type Draft = NewPrayerRequest;

    const KIND: EntityKind = EntityKind::PrayerRequests;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, d: NewPrayerRequest) -> Self {
        Self {
            id,
            name: d.name,
            request: d.request,
            is_anonymous: d.is_anonymous,
            date: d.date,
        }
    }

    fn into_parts(self) -> (RecordId, NewPrayerRequest) {
        (
            self.id,
            NewPrayerRequest {
                name: self.name,
                request: self.request,
                is_anonymous: self.is_anonymous,
                date: self.date,
            },
        )
    }
}

// ==================== Program ====================

/// Body of the singleton program document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramDocument {
    #[serde(default)]
    pub content: String,
}

/// `Option<NaiveDate>` stored as `""` when absent
mod optional_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw.trim(), FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

/// `NaiveTime` stored as `HH:MM`
mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_member_from_visitor() {
        let visitor = Visitor {
            id: RecordId::from("v1"),
            name: "Ana".to_string(),
            first_visit_date: date("2024-01-01"),
            phone: "123".to_string(),
            notes: "x".to_string(),
        };

        let member = NewMember::from_visitor(&visitor);
        assert_eq!(member.name, "Ana");
        assert_eq!(member.phone, "123");
        assert_eq!(member.role, "Membro");
        assert_eq!(member.status, MemberStatus::Active);
        assert!(member.birth_date.is_none());
    }

    #[test]
    fn test_member_wire_format() {
        let member = NewMember {
            name: "Ana".to_string(),
            role: "Membro".to_string(),
            status: MemberStatus::Active,
            phone: "123".to_string(),
            birth_date: None,
        };

        let value = serde_json::to_value(&member).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Ana",
                "role": "Membro",
                "status": "Ativo",
                "phone": "123",
                "birthDate": ""
            })
        );
    }

    #[test]
    fn test_member_birth_date_parsing() {
        let with_date: NewMember = serde_json::from_value(json!({
            "name": "Rute",
            "role": "Diaconisa",
            "status": "Inativo",
            "phone": "",
            "birthDate": "1990-05-12"
        }))
        .unwrap();
        assert_eq!(with_date.birth_date, Some(date("1990-05-12")));
        assert_eq!(with_date.status, MemberStatus::Inactive);

        // Older documents may lack the field entirely
        let missing: NewMember = serde_json::from_value(json!({
            "name": "Rute",
            "role": "Membro",
            "status": "Ativo"
        }))
        .unwrap();
        assert!(missing.birth_date.is_none());
        assert!(missing.phone.is_empty());
    }

    #[test]
    fn test_event_time_format() {
        let event: NewEvent = serde_json::from_value(json!({
            "name": "Culto",
            "date": "2024-03-10",
            "time": "19:30",
            "description": ""
        }))
        .unwrap();
        assert_eq!(event.time, NaiveTime::from_hms_opt(19, 30, 0).unwrap());
        assert!(event.image_data_url.is_none());

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["time"], "19:30");
        assert!(value.get("imageDataUrl").is_none());
    }

    #[test]
    fn test_event_starts_at() {
        let event = Event::from_draft(
            RecordId::from("e1"),
            NewEvent {
                name: "Vigília".to_string(),
                date: date("2024-03-10"),
                time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                description: String::new(),
                image_data_url: None,
            },
        );
        assert_eq!(
            event.starts_at(),
            date("2024-03-10").and_hms_opt(22, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_anonymous_request_hides_name() {
        let request = PrayerRequest {
            id: RecordId::from("p1"),
            name: Some("Carlos".to_string()),
            request: "Saúde da família".to_string(),
            is_anonymous: true,
            date: date("2024-01-01"),
        };
        assert_eq!(request.display_name(), None);

        let named = PrayerRequest {
            is_anonymous: false,
            ..request.clone()
        };
        assert_eq!(named.display_name(), Some("Carlos"));

        let blank = PrayerRequest {
            name: Some("  ".to_string()),
            is_anonymous: false,
            ..request
        };
        assert_eq!(blank.display_name(), None);
    }

    #[test]
    fn test_record_parts() {
        let member = Member {
            id: RecordId::from("m1"),
            name: "João".to_string(),
            role: "Presbítero".to_string(),
            status: MemberStatus::Active,
            phone: "81 9999-0000".to_string(),
            birth_date: Some(date("1970-02-03")),
        };

        let (id, draft) = member.clone().into_parts();
        assert_eq!(id.as_str(), "m1");
        assert_eq!(Member::from_draft(id, draft), member);
    }

    #[test]
    fn test_member_status_from_str() {
        assert_eq!("ativo".parse::<MemberStatus>(), Ok(MemberStatus::Active));
        assert_eq!("Inactive".parse::<MemberStatus>(), Ok(MemberStatus::Inactive));
        assert!("pending".parse::<MemberStatus>().is_err());
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(EntityKind::Members.collection(), "members");
        assert_eq!(EntityKind::PrayerRequests.collection(), "prayerRequests");
        assert_eq!(EntityKind::Program.collection(), "settings");
    }
}
