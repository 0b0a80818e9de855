//! FILENAME: report-engine/src/datasource.rs
//! PURPOSE: Resolves a template's named data sources into rows.
//! CONTEXT: Direct sources fetch one entity type through the repository and
//! apply field renaming; merge sources concatenate other sources in the listed
//! order and tag each row with where it came from. Both sort last.

use log::{debug, warn};

use report_core::{sort_rows, Params, RenderContext, Row, Value, SOURCE_FIELD};
use report_template::{DataSourceConfig, Template};

use crate::error::RepositoryError;
use crate::repository::{EntityKind, EntityQuery, Repository};

/// Request parameter naming the vehicle a report is scoped to.
pub const VEHICLE_SCOPE_PARAM: &str = "vehicle_id";

pub struct DataSourceResolver<'a, R: Repository> {
    repository: &'a R,
    template: &'a Template,
    vehicle_id: Option<Value>,
}

impl<'a, R: Repository> DataSourceResolver<'a, R> {
    pub fn new(repository: &'a R, template: &'a Template, params: &Params) -> Self {
        DataSourceResolver {
            repository,
            template,
            vehicle_id: params
                .get(VEHICLE_SCOPE_PARAM)
                .filter(|v| !v.is_null())
                .cloned(),
        }
    }

    /// Loads every declared source, then any source only a legacy sheet names.
    pub fn resolve_all(&self, ctx: &mut RenderContext) -> Result<(), RepositoryError> {
        for (name, config) in &self.template.data_sources {
            let rows = self.fetch(name, config)?;
            debug!("data source '{}' resolved to {} rows", name, rows.len());
            ctx.set_data(name.clone(), rows);
        }

        for source in self.template.legacy_sources() {
            if ctx.has_data(source) {
                continue;
            }
            let rows = self.fetch(source, &DataSourceConfig::for_entity(source))?;
            debug!("sheet source '{}' resolved to {} rows", source, rows.len());
            ctx.set_data(source, rows);
        }
        Ok(())
    }

    pub fn fetch(&self, name: &str, config: &DataSourceConfig) -> Result<Vec<Row>, RepositoryError> {
        let mut stack = Vec::new();
        self.fetch_guarded(name, config, &mut stack)
    }

    // ========================================================================
    // FETCHING
    // ========================================================================

    /// `stack` holds the sources currently being resolved, outermost first.
    fn fetch_guarded(
        &self,
        name: &str,
        config: &DataSourceConfig,
        stack: &mut Vec<String>,
    ) -> Result<Vec<Row>, RepositoryError> {
        if stack.iter().any(|s| s == name) {
            warn!(
                "data source '{}' merges itself via {}; treating it as empty",
                name,
                stack.join(" -> ")
            );
            return Ok(Vec::new());
        }

        stack.push(name.to_string());
        let result = match &config.merge {
            Some(members) => self.fetch_merged(members, stack),
            None => self.fetch_entity(name, config),
        };
        stack.pop();

        let mut rows = result?;
        if let Some(spec) = &config.sort {
            sort_rows(&mut rows, spec);
        }
        Ok(rows)
    }

    fn fetch_merged(
        &self,
        members: &[String],
        stack: &mut Vec<String>,
    ) -> Result<Vec<Row>, RepositoryError> {
        let mut merged = Vec::new();
        for member in members {
            let fallback;
            let config = match self.template.data_source(member) {
                Some(config) => config,
                None => {
                    fallback = DataSourceConfig::for_entity(member.as_str());
                    &fallback
                }
            };

            let rows = self.fetch_guarded(member, config, stack)?;
            merged.extend(rows.into_iter().map(|mut row| {
                row.insert(SOURCE_FIELD, member.as_str());
                row
            }));
        }
        Ok(merged)
    }

    fn fetch_entity(&self, name: &str, config: &DataSourceConfig) -> Result<Vec<Row>, RepositoryError> {
        let entity_name = config.entity.as_deref().unwrap_or(name);
        let Some(entity) = EntityKind::from_name(entity_name) else {
            warn!("data source '{}' names unknown entity '{}'", name, entity_name);
            return Ok(Vec::new());
        };

        let query = EntityQuery {
            entity,
            filter: config.filter.clone(),
            single: config.single,
            vehicle_id: self.vehicle_id.clone(),
        };
        let rows = self.repository.fetch_rows(&query)?;

        if config.fields.is_empty() {
            return Ok(rows);
        }
        Ok(rows.iter().map(|row| rename_fields(row, &config.fields)).collect())
    }
}

/// Additive renaming: each `(new, old)` pair takes the old field's value
/// (falling back to an existing `new` field), then every original field not
/// already set is carried over.
pub fn rename_fields(row: &Row, fields: &[(String, String)]) -> Row {
    let mut renamed = Row::new();
    for (new, old) in fields {
        let value = row
            .get(old)
            .filter(|v| !v.is_null())
            .or_else(|| row.get(new))
            .cloned()
            .unwrap_or(Value::Null);
        renamed.insert(new.as_str(), value);
    }

    for (field, value) in row.fields() {
        if renamed.value(field).is_null() {
            renamed.insert(field, value.clone());
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use pretty_assertions::assert_eq;
    use report_core::{SortOrder, SortSpec};
    use serde_json::json;

    fn repository() -> InMemoryRepository {
        InMemoryRepository::from_json(&json!({
            "parts": [
                { "vehicle_id": 1, "description": "Brake pads", "price": 45.0, "date": "2024-03-01" },
                { "vehicle_id": 2, "description": "Bulb", "price": 4.0, "date": "2024-01-01" }
            ],
            "consumables": [
                { "vehicle_id": 1, "name": "Oil", "cost": 30.0, "date": "2024-02-01" }
            ],
            "serviceRecords": [
                { "vehicle_id": 1, "type": "Annual", "cost": 180.0, "date": "2023-12-01" }
            ]
        }))
        .unwrap()
    }

    fn template(json: serde_json::Value) -> Template {
        Template::from_value(&json).unwrap()
    }

    fn scoped() -> Params {
        let mut params = Params::new();
        params.insert(VEHICLE_SCOPE_PARAM.to_string(), Value::Number(1.0));
        params
    }

    fn column(rows: &[Row], field: &str) -> Vec<String> {
        rows.iter().map(|r| r.value(field).display_string()).collect()
    }

    #[test]
    fn test_merge_keeps_member_order_and_tags() {
        let template = template(json!({
            "dataSources": {
                "costs": { "merge": ["parts", "consumables", "serviceRecords"] }
            }
        }));
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &scoped());
        let rows = resolver
            .fetch("costs", template.data_source("costs").unwrap())
            .unwrap();

        assert_eq!(column(&rows, SOURCE_FIELD), vec!["parts", "consumables", "serviceRecords"]);
        assert_eq!(rows[0].source(), Some("parts"));
    }

    #[test]
    fn test_merge_sorts_after_concatenation() {
        let template = template(json!({
            "dataSources": {
                "costs": {
                    "merge": ["parts", "consumables"],
                    "sort": { "field": "date", "order": "desc" }
                }
            }
        }));
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &scoped());
        let rows = resolver
            .fetch("costs", template.data_source("costs").unwrap())
            .unwrap();
        assert_eq!(column(&rows, "date"), vec!["2024-03-01", "2024-02-01"]);
    }

    #[test]
    fn test_merge_member_uses_its_own_config() {
        let template = template(json!({
            "dataSources": {
                "parts": { "entity": "parts", "fields": { "cost": "price" } },
                "costs": { "merge": ["parts", "consumables"] }
            }
        }));
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &scoped());
        let rows = resolver
            .fetch("costs", template.data_source("costs").unwrap())
            .unwrap();
        assert_eq!(column(&rows, "cost"), vec!["45", "30"]);
    }

    #[test]
    fn test_rename_is_additive() {
        let row = Row::from_pairs([("price", Value::Number(10.0)), ("name", Value::text("Pads"))]);
        let renamed = rename_fields(
            &row,
            &[
                ("cost".to_string(), "price".to_string()),
                ("label".to_string(), "missing".to_string()),
            ],
        );
        let fields: Vec<&str> = renamed.fields().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["cost", "label", "price", "name"]);
        assert_eq!(renamed.value("cost"), &Value::Number(10.0));
        assert!(renamed.value("label").is_null());
    }

    #[test]
    fn test_rename_falls_back_to_existing_new_field() {
        let row = Row::from_pairs([("cost", Value::Number(7.0)), ("price", Value::Null)]);
        let renamed = rename_fields(&row, &[("cost".to_string(), "price".to_string())]);
        assert_eq!(renamed.value("cost"), &Value::Number(7.0));
    }

    #[test]
    fn test_unknown_entity_is_empty() {
        let template = template(json!({ "dataSources": { "trips": {} } }));
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &Params::new());
        assert!(resolver
            .fetch("trips", template.data_source("trips").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_merge_cycle_resolves_to_empty() {
        let template = template(json!({
            "dataSources": {
                "a": { "merge": ["b", "parts"] },
                "b": { "merge": ["a"] }
            }
        }));
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &scoped());
        let rows = resolver.fetch("a", template.data_source("a").unwrap()).unwrap();
        assert_eq!(column(&rows, "description"), vec!["Brake pads"]);
    }

    #[test]
    fn test_resolve_all_includes_sheet_sources() {
        let template = template(json!({
            "dataSources": { "spend": { "entity": "parts" } },
            "sheets": [ { "name": "Service", "source": "serviceRecords", "columns": [] } ]
        }));
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &scoped());
        let mut ctx = RenderContext::new(scoped());
        resolver.resolve_all(&mut ctx).unwrap();

        assert_eq!(ctx.data("spend").len(), 1);
        assert_eq!(ctx.data("serviceRecords").len(), 1);
    }

    #[test]
    fn test_direct_source_sorts() {
        let mut config = DataSourceConfig::for_entity("parts");
        config.sort = Some(SortSpec::new("date", SortOrder::Asc));
        let template = Template::default();
        let repo = repository();
        let resolver = DataSourceResolver::new(&repo, &template, &Params::new());
        let rows = resolver.fetch("parts", &config).unwrap();
        assert_eq!(column(&rows, "description"), vec!["Bulb", "Brake pads"]);
    }

    struct FailingRepository;

    impl Repository for FailingRepository {
        fn fetch_rows(&self, _query: &EntityQuery) -> Result<Vec<Row>, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_repository_failure_propagates() {
        let template = template(json!({ "dataSources": { "parts": {} } }));
        let resolver = DataSourceResolver::new(&FailingRepository, &template, &Params::new());
        let mut ctx = RenderContext::default();
        assert!(matches!(
            resolver.resolve_all(&mut ctx),
            Err(RepositoryError::Unavailable(_))
        ));
    }
}
