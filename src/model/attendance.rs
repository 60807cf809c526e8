use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Halfday,
}

/// One row per (employee, calendar day); the unique key lives in the
/// database schema.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2024-03-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "09:02", value_type = Option<String>)]
    #[serde(with = "hhmm_option")]
    pub time_in: Option<NaiveTime>,

    #[schema(example = "18:00", value_type = Option<String>)]
    #[serde(with = "hhmm_option")]
    pub time_out: Option<NaiveTime>,

    #[schema(example = "Present")]
    pub status: String,

    pub is_late: bool,
    pub recorded_by: Option<u64>,
}

/// Serde adapter for nullable "HH:mm" wire times backed by `NaiveTime`.
pub mod hhmm_option {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => NaiveTime::parse_from_str(&s, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "hhmm_option")]
        t: Option<NaiveTime>,
    }

    #[test]
    fn times_serialize_as_hhmm() {
        let w = Wrapper {
            t: NaiveTime::from_hms_opt(9, 5, 0),
        };
        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"t":"09:05"}"#);

        let none = Wrapper { t: None };
        assert_eq!(serde_json::to_string(&none).unwrap(), r#"{"t":null}"#);
    }

    #[test]
    fn times_parse_from_hhmm() {
        let w: Wrapper = serde_json::from_str(r#"{"t":"18:30"}"#).unwrap();
        assert_eq!(w.t, NaiveTime::from_hms_opt(18, 30, 0));

        let none: Wrapper = serde_json::from_str(r#"{"t":null}"#).unwrap();
        assert_eq!(none.t, None);

        assert!(serde_json::from_str::<Wrapper>(r#"{"t":"25:00"}"#).is_err());
    }
}
