//! Enriched ticket projection stored in the search index.
//!
//! Field names on the wire are the index mapping's names, including the
//! historical `bussiness` spelling, so existing dashboards keep working.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::compliance::ComplianceVerdict;
use crate::error::SyncError;
use crate::ticket::identity_hash;

/// The computed, enriched projection of a [`crate::Ticket`].
///
/// Durations are seconds. Every field participates in the content hash, so
/// a change to any of them (title, a newly resolved date, a recomputed
/// verdict) makes the record eligible for upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedTicket {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub class: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default, rename = "servicesubcategory_name")]
    pub service_subcategory_name: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default, rename = "agent_id_friendlyname")]
    pub agent: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default, rename = "team_id_friendlyname")]
    pub team: String,
    #[serde(default, rename = "caller_id_friendlyname")]
    pub caller: String,
    /// Team(s) of the caller, comma-separated, or "-"
    #[serde(default)]
    pub caller_team: String,
    #[serde(default)]
    pub origin: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_date: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub time_to_response_raw: f64,
    #[serde(default)]
    pub time_to_resolve_raw: f64,
    #[serde(default)]
    pub sla_compliance_response_raw: ComplianceVerdict,
    #[serde(default)]
    pub sla_compliance_resolve_raw: ComplianceVerdict,

    #[serde(default, rename = "time_to_response_business_hour")]
    pub time_to_response_business_hr: f64,
    #[serde(default, rename = "time_to_resolve_business_hour")]
    pub time_to_resolve_business_hr: f64,
    #[serde(default, rename = "sla_compliance_response_bussiness_hour")]
    pub sla_compliance_response_business_hr: ComplianceVerdict,
    #[serde(default, rename = "sla_compliance_resolve_bussiness_hour")]
    pub sla_compliance_resolve_business_hr: ComplianceVerdict,

    #[serde(default)]
    pub time_to_response_24bh: f64,
    #[serde(default)]
    pub time_to_resolve_24bh: f64,
    #[serde(default)]
    pub sla_compliance_response_24bh: ComplianceVerdict,
    #[serde(default)]
    pub sla_compliance_resolve_24bh: ComplianceVerdict,
}

impl IndexedTicket {
    /// Sink document ID for this record.
    pub fn identity_hash(&self) -> String {
        identity_hash(&self.id, &self.reference, &self.class)
    }

    /// Digest of the record's full canonical serialization.
    ///
    /// Two records with equal content hashes are interchangeable in the
    /// sink. Serialization order is the struct's field order, so the hash
    /// does not depend on how the sink happened to order `_source` keys.
    pub fn content_hash(&self) -> Result<String, SyncError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> IndexedTicket {
        IndexedTicket {
            id: "12".to_string(),
            reference: "I-000012".to_string(),
            class: "Incident".to_string(),
            title: "Printer on fire".to_string(),
            priority: "High".to_string(),
            caller_team: "-".to_string(),
            start_date: Some(
                FixedOffset::east_opt(7 * 3600)
                    .unwrap()
                    .with_ymd_and_hms(2024, 3, 4, 9, 0, 0)
                    .unwrap(),
            ),
            time_to_resolve_business_hr: 21600.0,
            sla_compliance_resolve_business_hr: ComplianceVerdict::Comply,
            ..Default::default()
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["ref"], "I-000012");
        assert_eq!(json["time_to_resolve_business_hour"], 21600.0);
        assert_eq!(json["sla_compliance_resolve_bussiness_hour"], "comply");
        assert_eq!(json["sla_compliance_response_24bh"], "");
        assert_eq!(json["start_date"], "2024-03-04T09:00:00+07:00");
        assert!(json.get("resolution_date").is_none());
    }

    #[test]
    fn test_content_hash_survives_sink_roundtrip() {
        let original = sample();
        // The sink hands documents back as JSON; keys may come back in any order.
        let stored = serde_json::to_string(&original).unwrap();
        let fetched: IndexedTicket = serde_json::from_str(&stored).unwrap();
        assert_eq!(
            original.content_hash().unwrap(),
            fetched.content_hash().unwrap()
        );
    }

    #[test]
    fn test_content_hash_detects_drift() {
        let original = sample();
        let mut changed = sample();
        changed.sla_compliance_resolve_business_hr = ComplianceVerdict::Overdue;
        assert_ne!(
            original.content_hash().unwrap(),
            changed.content_hash().unwrap()
        );
        assert_eq!(original.identity_hash(), changed.identity_hash());
    }

    #[test]
    fn test_sparse_document_deserializes() {
        let doc = r#"{"id":"1","ref":"R-1","class":"UserRequest"}"#;
        let ticket: IndexedTicket = serde_json::from_str(doc).unwrap();
        assert_eq!(ticket.reference, "R-1");
        assert_eq!(ticket.sla_compliance_resolve_raw, ComplianceVerdict::Unknown);
    }
}
