/// `HH:MM` 24-hour clock times stored as minutes after midnight.
///
/// `24:00` is accepted so that a store can close at the very end of a day.
pub mod time_of_day {
    use schemars::gen::SchemaGenerator;
    use schemars::schema::{InstanceType, Schema, SchemaObject};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    pub fn format(minutes: u16) -> String {
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }

    pub fn parse(s: &str) -> Result<u16, String> {
        let (hours, minutes) = s
            .split_once(':')
            .ok_or_else(|| format!("expected format HH:MM, got '{}'", s))?;

        let hours: u16 = hours.trim().parse().map_err(|_| {
            format!("invalid hour in '{}'", s)
        })?;
        let minutes: u16 = minutes.trim().parse().map_err(|_| {
            format!("invalid minute in '{}'", s)
        })?;

        if hours > 24 || minutes >= 60 {
            return Err(format!("time of day out of range: '{}'", s));
        }

        let total = hours * 60 + minutes;
        if total > MINUTES_PER_DAY {
            return Err(format!("time of day out of range: '{}'", s));
        }
        Ok(total)
    }

    pub fn serialize<S>(minutes: &u16, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(*minutes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub fn schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("HH:MM".to_owned()),
            ..Default::default()
        }
        .into()
    }

}
