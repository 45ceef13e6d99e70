/**
 * Logistics Record Data Structures
 *
 * This module defines the tracking record shared by the sync client, the
 * local cache and the record store server, together with the fixed carrier
 * table and the create/update payloads used on the wire.
 *
 * All structures serialize with camelCase field names so cached payloads,
 * share tokens and HTTP bodies use one representation.
 */
use crate::shared::error::SharedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known couriers
///
/// A closed enumeration used only for labelling records. The canonical code
/// is the lowercase short name that is serialized on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Ups,
    Fedex,
    Dhl,
    Usps,
    Tnt,
    Sf,
    Ems,
    Aramex,
    Other,
}

impl Carrier {
    /// Every carrier, in display order
    pub const ALL: [Carrier; 9] = [
        Carrier::Ups,
        Carrier::Fedex,
        Carrier::Dhl,
        Carrier::Usps,
        Carrier::Tnt,
        Carrier::Sf,
        Carrier::Ems,
        Carrier::Aramex,
        Carrier::Other,
    ];

    /// Short code used in storage and on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Carrier::Ups => "ups",
            Carrier::Fedex => "fedex",
            Carrier::Dhl => "dhl",
            Carrier::Usps => "usps",
            Carrier::Tnt => "tnt",
            Carrier::Sf => "sf",
            Carrier::Ems => "ems",
            Carrier::Aramex => "aramex",
            Carrier::Other => "other",
        }
    }

    /// Human-readable carrier name
    pub fn display_name(&self) -> &'static str {
        match self {
            Carrier::Ups => "UPS",
            Carrier::Fedex => "FedEx",
            Carrier::Dhl => "DHL Express",
            Carrier::Usps => "USPS",
            Carrier::Tnt => "TNT",
            Carrier::Sf => "SF Express",
            Carrier::Ems => "China EMS",
            Carrier::Aramex => "Aramex",
            Carrier::Other => "Other",
        }
    }

    /// Look up a carrier by code, ignoring case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|carrier| carrier.code().eq_ignore_ascii_case(code))
    }
}

impl FromStr for Carrier {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| SharedError::validation("carrier", format!("unknown carrier code '{}'", s)))
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Delivery status of a shipment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    #[default]
    Pending,
    InTransit,
    OutForDelivery,
    Delivered,
    Exception,
    Unknown,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Pending => "pending",
            TrackingStatus::InTransit => "in_transit",
            TrackingStatus::OutForDelivery => "out_for_delivery",
            TrackingStatus::Delivered => "delivered",
            TrackingStatus::Exception => "exception",
            TrackingStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for TrackingStatus {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(TrackingStatus::Pending),
            "in_transit" => Ok(TrackingStatus::InTransit),
            "out_for_delivery" => Ok(TrackingStatus::OutForDelivery),
            "delivered" => Ok(TrackingStatus::Delivered),
            "exception" => Ok(TrackingStatus::Exception),
            "unknown" => Ok(TrackingStatus::Unknown),
            other => Err(SharedError::validation("status", format!("unknown status '{}'", other))),
        }
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single carrier scan event
///
/// Populated by the tracking-query collaborator. The sync logic stores and
/// forwards these untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TrackingStatus>,
}

/// A tracked shipment
///
/// # Fields
/// * `id` - Opaque identifier (client UUID when created offline, store-assigned otherwise)
/// * `tracking_number` - User supplied, unique within the active record set
/// * `carrier` / `carrier_name` - Code and display name from the carrier table
/// * `status`, `is_favorite`, `is_delivered` - Independently mutable fields
/// * `last_update` - Set to the write time on every mutation
/// * `events` - Optional carrier scan history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsRecord {
    pub id: String,
    pub tracking_number: String,
    pub carrier: Carrier,
    pub carrier_name: String,
    #[serde(default)]
    pub status: TrackingStatus,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_delivered: bool,
    pub last_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TrackingEvent>>,
}

impl LogisticsRecord {
    /// Create a record with default status fields and a fresh client-side id
    pub fn new(tracking_number: impl Into<String>, carrier: Carrier) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), tracking_number, carrier, Utc::now())
    }

    /// Create a record with an explicit id and creation time
    pub fn with_id(
        id: impl Into<String>,
        tracking_number: impl Into<String>,
        carrier: Carrier,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tracking_number: tracking_number.into(),
            carrier,
            carrier_name: carrier.display_name().to_string(),
            status: TrackingStatus::Pending,
            is_favorite: false,
            is_delivered: false,
            last_update: now,
            created_at: now,
            updated_at: now,
            events: None,
        }
    }

    /// Apply a partial update, stamping `last_update` and `updated_at`
    pub fn apply_patch(&mut self, patch: &RecordPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(is_delivered) = patch.is_delivered {
            self.is_delivered = is_delivered;
        }
        if let Some(ref events) = patch.events {
            self.events = Some(events.clone());
        }
        self.last_update = patch.last_update.unwrap_or(now);
        self.updated_at = now;
    }
}

/// Create payload sent to the record store
///
/// `id` is `None` for online creation (the store assigns one) and set when
/// replaying a record that was created offline, so later queued mutations
/// that reference it still line up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tracking_number: String,
    pub carrier: Carrier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_name: Option<String>,
    #[serde(default)]
    pub status: TrackingStatus,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TrackingEvent>>,
}

impl NewRecord {
    /// Payload for a fresh tracking number with default status fields
    pub fn new(tracking_number: impl Into<String>, carrier: Carrier) -> Self {
        Self {
            id: None,
            tracking_number: tracking_number.into(),
            carrier,
            carrier_name: Some(carrier.display_name().to_string()),
            status: TrackingStatus::Pending,
            is_favorite: false,
            is_delivered: false,
            last_update: None,
            events: None,
        }
    }

    /// Build the record the store would materialize from this payload
    pub fn into_record(self, id: String, now: DateTime<Utc>) -> LogisticsRecord {
        LogisticsRecord {
            id,
            tracking_number: self.tracking_number,
            carrier: self.carrier,
            carrier_name: self
                .carrier_name
                .unwrap_or_else(|| self.carrier.display_name().to_string()),
            status: self.status,
            is_favorite: self.is_favorite,
            is_delivered: self.is_delivered,
            last_update: self.last_update.unwrap_or(now),
            created_at: now,
            updated_at: now,
            events: self.events,
        }
    }
}

impl From<&LogisticsRecord> for NewRecord {
    fn from(record: &LogisticsRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            tracking_number: record.tracking_number.clone(),
            carrier: record.carrier,
            carrier_name: Some(record.carrier_name.clone()),
            status: record.status,
            is_favorite: record.is_favorite,
            is_delivered: record.is_delivered,
            last_update: Some(record.last_update),
            events: record.events.clone(),
        }
    }
}

/// Partial update payload; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TrackingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_delivered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TrackingEvent>>,
}

impl RecordPatch {
    pub fn favorite(is_favorite: bool, now: DateTime<Utc>) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            last_update: Some(now),
            ..Self::default()
        }
    }

    pub fn delivered(is_delivered: bool, now: DateTime<Utc>) -> Self {
        Self {
            is_delivered: Some(is_delivered),
            status: is_delivered.then_some(TrackingStatus::Delivered),
            last_update: Some(now),
            ..Self::default()
        }
    }

    pub fn status(status: TrackingStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            last_update: Some(now),
            ..Self::default()
        }
    }

    /// True when the patch carries no field changes
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.is_favorite.is_none()
            && self.is_delivered.is_none()
            && self.events.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_lookup_is_case_insensitive() {
        assert_eq!(Carrier::from_code("UPS"), Some(Carrier::Ups));
        assert_eq!(Carrier::from_code(" fedex "), Some(Carrier::Fedex));
        assert_eq!(Carrier::from_code("pigeon"), None);
    }

    #[test]
    fn test_carrier_table_codes_are_unique() {
        let mut codes: Vec<_> = Carrier::ALL.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), Carrier::ALL.len());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = LogisticsRecord::new("1Z999AA10123456784", Carrier::Ups);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["trackingNumber"], "1Z999AA10123456784");
        assert_eq!(json["carrier"], "ups");
        assert_eq!(json["carrierName"], "UPS");
        assert_eq!(json["isFavorite"], false);
        assert!(json.get("events").is_none());
    }

    #[test]
    fn test_new_record_defaults() {
        let record = LogisticsRecord::new("ABC", Carrier::Dhl);
        assert_eq!(record.status, TrackingStatus::Pending);
        assert!(!record.is_favorite);
        assert!(!record.is_delivered);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_apply_patch_touches_only_given_fields() {
        let now = Utc::now();
        let mut record = LogisticsRecord::with_id("r1", "ABC", Carrier::Sf, now);
        let later = now + chrono::Duration::seconds(5);

        record.apply_patch(&RecordPatch::favorite(true, later), later);

        assert!(record.is_favorite);
        assert!(!record.is_delivered);
        assert_eq!(record.last_update, later);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn test_delivered_patch_sets_status() {
        let patch = RecordPatch::delivered(true, Utc::now());
        assert_eq!(patch.status, Some(TrackingStatus::Delivered));

        let undo = RecordPatch::delivered(false, Utc::now());
        assert_eq!(undo.status, None);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in-transit".parse::<TrackingStatus>().unwrap(), TrackingStatus::InTransit);
        assert!("lost-at-sea".parse::<TrackingStatus>().is_err());
    }

    #[test]
    fn test_new_record_round_trips_through_record() {
        let record = LogisticsRecord::new("XYZ", Carrier::Ems);
        let payload = NewRecord::from(&record);
        let rebuilt = payload.into_record(record.id.clone(), record.created_at);
        assert_eq!(rebuilt.tracking_number, record.tracking_number);
        assert_eq!(rebuilt.carrier_name, "China EMS");
    }
}
