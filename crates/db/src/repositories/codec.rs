//! Column encoding shared by the SQL repositories. Ids are stored as hyphenated uuid
//! text, timestamps as fixed-width RFC 3339 so they sort lexically, structured values as
//! JSON text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::RepositoryError;

pub fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, RepositoryError> {
    let raw: String = get(row, column)?;
    Uuid::parse_str(&raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub fn get_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = get(row, column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub fn get_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, RepositoryError> {
    let raw: String = get(row, column)?;
    serde_json::from_str(&raw)
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub fn get_enum<T>(
    row: &SqliteRow,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, RepositoryError> {
    let raw: String = get(row, column)?;
    parse(&raw).ok_or_else(|| RepositoryError::Decode(format!("{column}: unknown value `{raw}`")))
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}
