//! FILENAME: report-engine/src/repository.rs
//! PURPOSE: The record-store boundary: entity kinds, queries, and the
//! `Repository` trait, plus an in-memory implementation.
//! CONTEXT: Projection of domain entities to flat rows belongs to the caller.
//! The engine only names an entity kind and passes along the template's
//! filter flags and the request scope.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use report_core::{Row, Value};

use crate::error::RepositoryError;

/// Entity types a data source can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Vehicle,
    FuelRecord,
    Part,
    Consumable,
    ServiceRecord,
    MotRecord,
    Insurance,
    RoadTax,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Vehicle,
        EntityKind::FuelRecord,
        EntityKind::Part,
        EntityKind::Consumable,
        EntityKind::ServiceRecord,
        EntityKind::MotRecord,
        EntityKind::Insurance,
        EntityKind::RoadTax,
    ];

    /// Accepts the collection name or the entity class name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "vehicles" | "vehicle" | "Vehicle" => Some(EntityKind::Vehicle),
            "fuelRecords" | "FuelRecord" => Some(EntityKind::FuelRecord),
            "parts" | "Part" => Some(EntityKind::Part),
            "consumables" | "Consumable" => Some(EntityKind::Consumable),
            "serviceRecords" | "ServiceRecord" => Some(EntityKind::ServiceRecord),
            "motRecords" | "MotRecord" => Some(EntityKind::MotRecord),
            "insurance" | "Insurance" => Some(EntityKind::Insurance),
            "roadTax" | "RoadTax" => Some(EntityKind::RoadTax),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Vehicle => "vehicles",
            EntityKind::FuelRecord => "fuelRecords",
            EntityKind::Part => "parts",
            EntityKind::Consumable => "consumables",
            EntityKind::ServiceRecord => "serviceRecords",
            EntityKind::MotRecord => "motRecords",
            EntityKind::Insurance => "insurance",
            EntityKind::RoadTax => "roadTax",
        }
    }

    /// Row field that carries the owning vehicle's id.
    pub fn scope_field(&self) -> &'static str {
        match self {
            EntityKind::Vehicle => "id",
            _ => "vehicle_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    pub entity: EntityKind,
    /// Named boolean flags from the data-source config.
    pub filter: BTreeMap<String, bool>,
    /// Only the first matching row is wanted.
    pub single: bool,
    /// Caller scope: the vehicle the report is about, when there is one.
    pub vehicle_id: Option<Value>,
}

impl EntityQuery {
    pub fn new(entity: EntityKind) -> Self {
        EntityQuery {
            entity,
            filter: BTreeMap::new(),
            single: false,
            vehicle_id: None,
        }
    }
}

pub trait Repository {
    fn fetch_rows(&self, query: &EntityQuery) -> Result<Vec<Row>, RepositoryError>;
}

impl<R: Repository + ?Sized> Repository for &R {
    fn fetch_rows(&self, query: &EntityQuery) -> Result<Vec<Row>, RepositoryError> {
        (**self).fetch_rows(query)
    }
}

// ============================================================================
// IN-MEMORY REPOSITORY
// ============================================================================

/// Rows held per entity kind.
///
/// Filter flags keep rows whose same-named field is truthy; `single` keeps the
/// first match; the vehicle scope applies when both the query and the row
/// carry an id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    rows: BTreeMap<EntityKind, Vec<Row>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, entity: EntityKind, rows: Vec<Row>) -> Self {
        self.insert(entity, rows);
        self
    }

    pub fn insert(&mut self, entity: EntityKind, rows: Vec<Row>) {
        self.rows.entry(entity).or_default().extend(rows);
    }

    /// Loads fixture data shaped `{ "fuelRecords": [ {..}, .. ], .. }`.
    pub fn from_json(json: &Json) -> Result<Self, RepositoryError> {
        let object = json
            .as_object()
            .ok_or_else(|| RepositoryError::InvalidData("root must be an object".to_string()))?;

        let mut repository = InMemoryRepository::new();
        for (name, rows) in object {
            let entity = EntityKind::from_name(name)
                .ok_or_else(|| RepositoryError::InvalidData(format!("unknown entity '{}'", name)))?;
            let list = rows.as_array().ok_or_else(|| {
                RepositoryError::InvalidData(format!("'{}' must be an array of objects", name))
            })?;
            let parsed = list
                .iter()
                .map(|row| {
                    Row::from_json(row).ok_or_else(|| {
                        RepositoryError::InvalidData(format!("'{}' holds a non-object row", name))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            repository.insert(entity, parsed);
        }
        Ok(repository)
    }
}

fn in_scope(row: &Row, field: &str, vehicle_id: Option<&Value>) -> bool {
    match (vehicle_id, row.get(field)) {
        (Some(wanted), Some(actual)) if !wanted.is_null() && !actual.is_null() => {
            wanted.display_string() == actual.display_string()
        }
        _ => true,
    }
}

impl Repository for InMemoryRepository {
    fn fetch_rows(&self, query: &EntityQuery) -> Result<Vec<Row>, RepositoryError> {
        let Some(rows) = self.rows.get(&query.entity) else {
            return Ok(Vec::new());
        };
        let scope_field = query.entity.scope_field();

        let matching = rows
            .iter()
            .filter(|row| in_scope(row, scope_field, query.vehicle_id.as_ref()))
            .filter(|row| {
                query
                    .filter
                    .iter()
                    .all(|(flag, wanted)| !*wanted || row.value(flag).is_truthy())
            })
            .cloned();

        Ok(if query.single {
            matching.take(1).collect()
        } else {
            matching.collect()
        })
    }
}
