use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Body exchanged between stages: what a producer posts to `/post`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    pub service_name: String,
    pub value: i64,
}

/// One value accepted into a stage's [`ValueStore`](crate::store::ValueStore).
///
/// Records are only created by the store, which stamps the acceptance time while
/// holding its write lock. There are no setters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(serialize_with = "to_rfc3339", deserialize_with = "from_rfc3339")]
    timestamp: DateTime<Utc>,
    service_name: String,
    value: i64,
}

impl Record {
    pub(crate) fn new(timestamp: DateTime<Utc>, service_name: String, value: i64) -> Self {
        Record {
            timestamp,
            service_name,
            value,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

fn to_rfc3339<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

fn from_rfc3339<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payload_field_names() {
        let payload: RelayPayload =
            serde_json::from_str(r#"{"serviceName": "serviceA", "value": 7}"#).unwrap();
        assert_eq!(
            payload,
            RelayPayload {
                service_name: "serviceA".into(),
                value: 7
            }
        );

        let encoded = serde_json::to_value(&payload).unwrap();
        assert_eq!(encoded, serde_json::json!({"serviceName": "serviceA", "value": 7}));
    }

    #[test]
    fn test_payload_rejects_wrong_types() {
        assert!(serde_json::from_str::<RelayPayload>(r#"{"value": "not-a-number"}"#).is_err());
        assert!(serde_json::from_str::<RelayPayload>(r#"{"serviceName": 1, "value": 1}"#).is_err());
        assert!(serde_json::from_str::<RelayPayload>(r#"{"serviceName": "a"}"#).is_err());
        assert!(serde_json::from_str::<RelayPayload>("not json").is_err());
    }

    #[test]
    fn test_record_serializes_rfc3339() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let record = Record::new(timestamp, "serviceC".into(), 108);

        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({
                "timestamp": "2024-03-01T12:30:05.000000000Z",
                "serviceName": "serviceC",
                "value": 108,
            })
        );

        let decoded: Record = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
