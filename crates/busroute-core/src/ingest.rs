//! Adapt loosely-shaped student payloads into [`Student`] once, at the edge.
//!
//! Upstream services disagree on field names (`lat`/`latitude`, `lng`/`lon`,
//! numeric or string ids) and on whether the list is bare or wrapped in an object.

use crate::models::{Coordinate, Student};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Text(text) => text,
            IdValue::Number(number) => number.to_string(),
        }
    }
}

/// A student as received from an upstream API.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRecord {
    #[serde(alias = "student_id", alias = "studentId", alias = "_id")]
    id: IdValue,
    #[serde(default, alias = "full_name", alias = "fullName")]
    name: Option<String>,
    #[serde(default)]
    coordinate: Option<Coordinate>,
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "lng", alias = "longitude")]
    lon: Option<f64>,
    #[serde(default, alias = "home_address", alias = "homeAddress")]
    address: Option<String>,
    #[serde(default, alias = "class", alias = "class_name", alias = "className")]
    class_label: Option<String>,
}

impl From<StudentRecord> for Student {
    fn from(record: StudentRecord) -> Self {
        let coordinate = record.coordinate.or(match (record.lat, record.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        });
        Student {
            id: record.id.into(),
            name: record.name.unwrap_or_default(),
            coordinate,
            address: record.address.unwrap_or_default(),
            class_label: record.class_label,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StudentList {
    Bare(Vec<StudentRecord>),
    Wrapped {
        #[serde(alias = "data", alias = "items", alias = "results")]
        students: Vec<StudentRecord>,
    },
}

/// Parse any accepted student list shape.
pub fn parse_students(value: serde_json::Value) -> Result<Vec<Student>, serde_json::Error> {
    let list: StudentList = serde_json::from_value(value)?;
    let records = match list {
        StudentList::Bare(records) => records,
        StudentList::Wrapped { students } => students,
    };
    Ok(records.into_iter().map(Student::from).collect())
}
