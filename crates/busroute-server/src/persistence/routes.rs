//! Route persistence operations.

use async_trait::async_trait;
use busroute_core::{Anchor, Coordinate, RouteDirection, RouteWarning, StopCandidate, StopKind, SuggestedRoute};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::db::Database;
use super::storage::{StorageEngine, StorageError, StorageTransaction};

/// [`StorageEngine`] over the SQLite pool.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl StorageEngine for SqliteStorage {
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StorageTransaction for SqliteTransaction {
    async fn create_route(&mut self, route: &SuggestedRoute) -> Result<String, StorageError> {
        let route_id = Uuid::new_v4().to_string();
        let warnings = serde_json::to_string(&route.warnings)?;

        sqlx::query(
            r#"
            INSERT INTO routes (
                route_id, name, direction,
                origin_name, origin_address, origin_lat, origin_lon,
                destination_name, destination_address, destination_lat, destination_lon,
                student_count, distance_m, duration_s, used_fallback_estimate,
                warnings, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&route_id)
        .bind(&route.name)
        .bind(route.direction.as_str())
        .bind(&route.origin.name)
        .bind(&route.origin.address)
        .bind(route.origin.coordinate.lat)
        .bind(route.origin.coordinate.lon)
        .bind(&route.destination.name)
        .bind(&route.destination.address)
        .bind(route.destination.coordinate.lat)
        .bind(route.destination.coordinate.lon)
        .bind(route.student_count as i64)
        .bind(route.distance_m)
        .bind(route.duration_s)
        .bind(route.used_fallback_estimate)
        .bind(&warnings)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *self.tx)
        .await?;

        Ok(route_id)
    }

    async fn create_stop(
        &mut self,
        route_id: &str,
        stop: &StopCandidate,
    ) -> Result<String, StorageError> {
        let stop_row_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO route_stops (stop_row_id, route_id, stop_id, kind, sequence, lat, lon, address)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&stop_row_id)
        .bind(route_id)
        .bind(&stop.stop_id)
        .bind(stop.kind.as_str())
        .bind(stop.sequence as i64)
        .bind(stop.coordinate.lat)
        .bind(stop.coordinate.lon)
        .bind(&stop.address)
        .execute(&mut *self.tx)
        .await?;

        Ok(stop_row_id)
    }

    async fn assign_students_to_stop(
        &mut self,
        stop_row_id: &str,
        student_ids: &[String],
    ) -> Result<(), StorageError> {
        for student_id in student_ids {
            sqlx::query("INSERT INTO stop_students (stop_row_id, student_id) VALUES (?1, ?2)")
                .bind(stop_row_id)
                .bind(student_id)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Route header as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub route_id: String,
    pub name: String,
    pub direction: RouteDirection,
    pub origin: Anchor,
    pub destination: Anchor,
    pub student_count: usize,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    pub used_fallback_estimate: bool,
    pub warnings: Vec<RouteWarning>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedStop {
    pub stop_row_id: String,
    #[serde(flatten)]
    pub stop: StopCandidate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedRoute {
    #[serde(flatten)]
    pub summary: RouteSummary,
    pub stops: Vec<CommittedStop>,
}

const ROUTE_COLUMNS: &str = "route_id, name, direction, \
    origin_name, origin_address, origin_lat, origin_lon, \
    destination_name, destination_address, destination_lat, destination_lon, student_count, distance_m, duration_s, \
    used_fallback_estimate, warnings, created_at";

/// Load all committed route headers, newest first.
pub async fn list_routes(pool: &SqlitePool) -> anyhow::Result<Vec<RouteSummary>> {
    let rows = sqlx::query_as::<_, RouteRow>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM routes ORDER BY created_at DESC, name"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Load one committed route with its stops and students.
pub async fn load_route(pool: &SqlitePool, route_id: &str) -> anyhow::Result<Option<CommittedRoute>> {
    let row = sqlx::query_as::<_, RouteRow>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM routes WHERE route_id = ?1"
    ))
    .bind(route_id)
    .fetch_optional(pool)
    .await?;

    let summary: RouteSummary = match row {
        Some(row) => row.try_into()?,
        None => return Ok(None),
    };

    let stop_rows = sqlx::query_as::<_, StopRow>(
        "SELECT stop_row_id, stop_id, kind, sequence, lat, lon, address FROM route_stops WHERE route_id = ?1 ORDER BY sequence",
    )
    .bind(route_id)
    .fetch_all(pool)
    .await?;

    let mut stops = Vec::with_capacity(stop_rows.len());
    for row in stop_rows {
        let student_ids: Vec<String> = sqlx::query_scalar(
            "SELECT student_id FROM stop_students WHERE stop_row_id = ?1 ORDER BY rowid",
        )
        .bind(&row.stop_row_id)
        .fetch_all(pool)
        .await?;
        stops.push(row.into_committed(student_ids)?);
    }

    Ok(Some(CommittedRoute { summary, stops }))
}

// Internal row types for SQLx
#[derive(sqlx::FromRow)]
struct RouteRow {
    route_id: String,
    name: String,
    direction: String,
    origin_name: String,
    origin_address: String,
    origin_lat: f64,
    origin_lon: f64,
    destination_name: String,
    destination_address: String,
    destination_lat: f64,
    destination_lon: f64,
    student_count: i64,
    distance_m: Option<f64>,
    duration_s: Option<f64>,
    used_fallback_estimate: bool,
    warnings: String,
    created_at: String,
}

impl TryFrom<RouteRow> for RouteSummary {
    type Error = anyhow::Error;

    fn try_from(row: RouteRow) -> anyhow::Result<Self> {
        let direction = RouteDirection::parse(&row.direction)
            .ok_or_else(|| anyhow::anyhow!("unknown route direction {:?}", row.direction))?;
        Ok(RouteSummary {
            route_id: row.route_id,
            name: row.name,
            direction,
            origin: Anchor {
                name: row.origin_name,
                address: row.origin_address,
                coordinate: Coordinate::new(row.origin_lat, row.origin_lon),
            },
            destination: Anchor {
                name: row.destination_name,
                address: row.destination_address,
                coordinate: Coordinate::new(row.destination_lat, row.destination_lon),
            },
            student_count: row.student_count.max(0) as usize,
            distance_m: row.distance_m,
            duration_s: row.duration_s,
            used_fallback_estimate: row.used_fallback_estimate,
            warnings: serde_json::from_str(&row.warnings)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StopRow {
    stop_row_id: String,
    stop_id: String,
    kind: String,
    sequence: i64,
    lat: f64,
    lon: f64,
    address: String,
}

impl StopRow {
    fn into_committed(self, student_ids: Vec<String>) -> anyhow::Result<CommittedStop> {
        let kind = StopKind::parse(&self.kind)
            .ok_or_else(|| anyhow::anyhow!("unknown stop kind {:?}", self.kind))?;
        Ok(CommittedStop {
            stop_row_id: self.stop_row_id,
            stop: StopCandidate {
                stop_id: self.stop_id,
                kind,
                coordinate: Coordinate::new(self.lat, self.lon),
                address: self.address,
                student_ids,
                sequence: u32::try_from(self.sequence)?,
            },
        })
    }
}
