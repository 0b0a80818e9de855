//! FILENAME: report-template/src/load.rs
//! PURPOSE: Lenient conversion from template JSON to the canonical model.
//! CONTEXT: Only a root that is not an object fails the load. Every fragment
//! below it (data source, calculation, style, section, column, cell) is parsed
//! on its own; a fragment that does not fit is dropped with a warning and the
//! rest of the template still loads.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

use report_core::{
    col_to_index, parse_range, BorderWeight, CellStyle, Color, SortOrder, SortSpec, TextAlign,
    Value, ValueFormat,
};

use crate::error::TemplateError;
use crate::model::*;
use crate::schema::*;

impl Template {
    /// Parses template text. Fails only on invalid JSON or a non-object root.
    pub fn from_json_str(text: &str) -> Result<Template, TemplateError> {
        let json: Json = serde_json::from_str(text)?;
        Template::from_value(&json)
    }

    pub fn from_value(json: &Json) -> Result<Template, TemplateError> {
        let root = json.as_object().ok_or(TemplateError::NotAnObject(json_kind(json)))?;

        let styles = load_styles(root.get("styles"));
        let (layout, sheets, pdf_layout) = {
            let sections = SectionParser { styles: &styles };
            (
                load_layout(root.get("layout"), &sections),
                load_sheets(root.get("sheets"), &sections),
                root.get("pdfLayout")
                    .filter(|v| !v.is_null())
                    .and_then(|v| as_list(v, "pdfLayout"))
                    .map(|list| sections.parse_all(list, "table")),
            )
        };

        let template = Template {
            name: string_field(root, "name"),
            title: string_field(root, "title"),
            filename: string_field(root, "filename"),
            data_sources: load_data_sources(root.get("dataSources")),
            calculations: load_calculations(root.get("calculations")),
            column_widths: load_column_widths(root.get("columnWidths")),
            layout,
            sheets,
            pdf_layout,
            page_setup: load_page_setup(root.get("pageSetup")),
            styles,
        };

        debug!(
            "Loaded template '{}': {} data sources, {} calculations, {} legacy sheets",
            template.name.as_deref().unwrap_or("report"),
            template.data_sources.len(),
            template.calculations.len(),
            template.sheets.len()
        );
        Ok(template)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Deserializes one fragment, logging and discarding it on failure.
fn parse_fragment<T: DeserializeOwned>(json: &Json, what: &str) -> Option<T> {
    match T::deserialize(json) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Skipping malformed {}: {}", what, e);
            None
        }
    }
}

fn as_object<'a>(json: &'a Json, what: &str) -> Option<&'a Map<String, Json>> {
    let object = json.as_object();
    if object.is_none() {
        warn!("Ignoring {}: expected an object, found {}", what, json_kind(json));
    }
    object
}

fn as_list<'a>(json: &'a Json, what: &str) -> Option<&'a [Json]> {
    let list = json.as_array().map(Vec::as_slice);
    if list.is_none() {
        warn!("Ignoring {}: expected an array, found {}", what, json_kind(json));
    }
    list
}

fn string_field(object: &Map<String, Json>, key: &str) -> Option<String> {
    match object.get(key)? {
        Json::String(s) => Some(s.clone()),
        Json::Null => None,
        other => Some(Value::from_json(other).display_string()),
    }
}

fn parse_color(hex: &str) -> Option<Color> {
    let color = Color::from_hex(hex);
    if color.is_none() {
        warn!("Ignoring unparseable color '{}'", hex);
    }
    color
}

fn parse_sort(raw: &RawSort) -> SortSpec {
    let defaults = SortSpec::default();
    SortSpec {
        field: raw.field.clone().unwrap_or(defaults.field),
        order: raw
            .order
            .as_deref()
            .map(SortOrder::from_name)
            .unwrap_or(defaults.order),
    }
}

fn parse_column_ref(col: &Option<ColumnRef>, what: &str) -> Option<u32> {
    let col = col.as_ref()?;
    let index = col.to_index();
    if index.is_none() {
        warn!("Ignoring invalid column reference {:?} in {}", col, what);
    }
    index
}

// ============================================================================
// STYLES
// ============================================================================

fn load_styles(json: Option<&Json>) -> BTreeMap<String, CellStyle> {
    let Some(object) = json.and_then(|v| as_object(v, "styles")) else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(name, raw)| {
            let raw: RawStyle = parse_fragment(raw, &format!("style '{}'", name))?;
            Some((name.clone(), convert_style(&raw)))
        })
        .collect()
}

pub(crate) fn convert_style(raw: &RawStyle) -> CellStyle {
    let mut style = CellStyle::new();

    if let Some(font) = &raw.font {
        style.bold = font.bold;
        style.italic = font.italic;
        style.font_size = font.size;
        style.font_color = font.color.as_deref().and_then(parse_color);
    }

    style.fill = match &raw.fill {
        Some(RawFill::Color(hex)) => parse_color(hex),
        Some(RawFill::Object { color: Some(hex) }) => parse_color(hex),
        _ => None,
    };

    // Any border other than "thin" draws medium.
    style.border = raw
        .border
        .as_deref()
        .map(|b| BorderWeight::from_name(b).unwrap_or(BorderWeight::Medium));

    style.align = raw
        .alignment
        .as_deref()
        .map(|a| TextAlign::from_name(a).unwrap_or(TextAlign::Left));

    if raw.wrap_text == Some(true) {
        style.wrap_text = Some(true);
    }
    style
}

// ============================================================================
// DATA SOURCES, CALCULATIONS, WIDTHS
// ============================================================================

fn load_data_sources(json: Option<&Json>) -> Vec<(String, DataSourceConfig)> {
    let Some(object) = json.and_then(|v| as_object(v, "dataSources")) else {
        return Vec::new();
    };
    object
        .iter()
        .filter_map(|(name, raw)| {
            let raw: RawDataSource = parse_fragment(raw, &format!("data source '{}'", name))?;
            Some((name.clone(), convert_data_source(name, raw)))
        })
        .collect()
}

fn convert_data_source(name: &str, raw: RawDataSource) -> DataSourceConfig {
    let fields = raw
        .fields
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(new_field, old)| match old {
            Json::String(old_field) => Some((new_field, old_field)),
            other => {
                warn!(
                    "Data source '{}': field mapping '{}' must name a field, found {}",
                    name,
                    new_field,
                    json_kind(&other)
                );
                None
            }
        })
        .collect();

    let filter = raw
        .filter
        .unwrap_or_default()
        .into_iter()
        .map(|(flag, wanted)| (flag, Value::from_json(&wanted).is_truthy()))
        .collect();

    let derived = raw.derived.as_deref().and_then(|d| {
        let kind = DerivedKind::from_name(d);
        if kind.is_none() {
            warn!("Data source '{}': unknown derived metric '{}'", name, d);
        }
        kind
    });

    let entity = match (&raw.entity, &raw.merge) {
        (None, None) => Some(name.to_string()),
        (entity, _) => entity.clone(),
    };

    DataSourceConfig {
        entity,
        merge: raw.merge,
        fields,
        sort: raw.sort.as_ref().map(parse_sort),
        filter,
        single: raw.single.unwrap_or(false),
        derived,
    }
}

fn load_calculations(json: Option<&Json>) -> Vec<(String, CalculationConfig)> {
    let Some(object) = json.and_then(|v| as_object(v, "calculations")) else {
        return Vec::new();
    };
    object
        .iter()
        .filter_map(|(name, raw)| {
            let raw: RawCalculation = parse_fragment(raw, &format!("calculation '{}'", name))?;
            let defaults = CalculationConfig::default();
            Some((
                name.clone(),
                CalculationConfig {
                    kind: raw
                        .kind
                        .as_deref()
                        .map(CalculationKind::from_name)
                        .unwrap_or(defaults.kind),
                    source: raw.source.unwrap_or(defaults.source),
                    field: raw.field.unwrap_or(defaults.field),
                },
            ))
        })
        .collect()
}

/// Keys are letters ("C") or 0-based indices ("2").
fn load_column_widths(json: Option<&Json>) -> BTreeMap<u32, f64> {
    let Some(object) = json.and_then(|v| as_object(v, "columnWidths")) else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(key, width)| {
            let col = if key.chars().all(|c| c.is_ascii_digit()) {
                key.parse::<u32>().ok()
            } else {
                col_to_index(key)
            };
            let width = Value::from_json(width).as_number();
            match (col, width) {
                (Some(col), Some(width)) => Some((col, width)),
                _ => {
                    warn!("Ignoring column width entry '{}'", key);
                    None
                }
            }
        })
        .collect()
}

fn load_page_setup(json: Option<&Json>) -> PageSetup {
    let raw: RawPageSetup = json
        .and_then(|v| parse_fragment(v, "pageSetup"))
        .unwrap_or_default();
    let orientation = match raw.orientation.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("portrait") => Orientation::Portrait,
        _ => Orientation::Landscape,
    };
    PageSetup { orientation }
}

// ============================================================================
// LAYOUT & SHEETS
// ============================================================================

fn load_layout(json: Option<&Json>, sections: &SectionParser) -> Option<Layout> {
    let raw: RawLayout = parse_fragment(json?, "layout")?;
    let Some(list) = raw.sections else {
        warn!("Ignoring layout without 'sections'");
        return None;
    };
    Some(Layout {
        name: raw.name,
        sections: sections.parse_all(&list, "cells"),
    })
}

fn load_sheets(json: Option<&Json>, sections: &SectionParser) -> Vec<LegacySheet> {
    let Some(list) = json.and_then(|v| as_list(v, "sheets")) else {
        return Vec::new();
    };
    list.iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let raw: RawSheet = parse_fragment(raw, &format!("sheet #{}", i + 1))?;
            let Some(source) = raw.source else {
                warn!("Skipping sheet #{} without a source", i + 1);
                return None;
            };
            Some(LegacySheet {
                name: raw.name,
                source,
                columns: sections.parse_columns(&raw.columns),
                sort: raw.sort.as_ref().map(parse_sort),
            })
        })
        .collect()
}

/// Parses sections with template styles at hand, so style names resolve in place.
struct SectionParser<'a> {
    styles: &'a BTreeMap<String, CellStyle>,
}

impl SectionParser<'_> {
    fn style(&self, name: &Option<String>) -> Option<CellStyle> {
        let name = name.as_deref()?;
        let style = self.styles.get(name).cloned();
        if style.is_none() {
            debug!("Style '{}' is not defined; ignoring", name);
        }
        style
    }

    fn parse_all(&self, list: &[Json], default_kind: &str) -> Vec<Section> {
        list.iter()
            .enumerate()
            .filter_map(|(i, json)| {
                let raw: RawSection = parse_fragment(json, &format!("section #{}", i + 1))?;
                self.section(raw, default_kind, i + 1)
            })
            .collect()
    }

    fn section(&self, raw: RawSection, default_kind: &str, position: usize) -> Option<Section> {
        let kind = raw.kind.clone().unwrap_or_else(|| default_kind.to_string());
        let placement = Placement {
            start_row: raw.start_row,
            row: raw.row,
        };
        if placement.is_out_of_range() {
            warn!(
                "Skipping section #{}: row is past worksheet row {}",
                position, MAX_GRID_ROW
            );
            return None;
        }

        let section = match kind.as_str() {
            "header" | "cells" | "columnHeaders" => Section::Cells(CellsSection {
                placement,
                cells: self.parse_cells(raw.cells.as_deref().unwrap_or_default()),
            }),
            "dataGrid" => {
                let (Some(source), Some(columns)) = (raw.source, raw.columns) else {
                    warn!("Skipping dataGrid section #{}: needs 'source' and 'columns'", position);
                    return None;
                };
                Section::DataGrid(DataGridSection {
                    placement,
                    source,
                    columns: self.parse_columns(&columns),
                    max_rows: Some(raw.max_rows.unwrap_or(1000)),
                    overflow: raw.overflow.map(|o| self.parse_columns(&o.columns)),
                    sort: raw.sort.as_ref().map(parse_sort),
                })
            }
            "totals" => Section::Totals(TotalsSection {
                placement,
                cells: self.parse_totals(raw.cells.as_deref().unwrap_or_default()),
            }),
            "vehicleDetails" | "details" => Section::Details(DetailsSection {
                placement,
                source: raw.source.unwrap_or_else(|| "vehicle".to_string()),
                fields: self.parse_detail_fields(raw.fields.as_deref().unwrap_or_default()),
                label_col: parse_column_ref(&raw.label_col, "labelCol").unwrap_or(20),
                value_col: parse_column_ref(&raw.value_col, "valueCol").unwrap_or(21),
                label_style: self.style(&raw.style),
                value_style: self.style(&raw.value_style.or(raw.style.clone())),
            }),
            "title" => Section::Title(TitleSection {
                text: raw.text.unwrap_or_default(),
                font_size: raw.font_size.unwrap_or(12.0),
                spacing: raw.spacing.unwrap_or(3.0),
            }),
            "text" => Section::Text(TextSection {
                text: raw.text.unwrap_or_default(),
                font_size: raw.font_size.unwrap_or(9.0),
                spacing: raw.spacing.unwrap_or(3.0),
            }),
            "table" => {
                let (Some(source), Some(columns)) = (raw.source, raw.columns) else {
                    warn!("Skipping table section #{}: needs 'source' and 'columns'", position);
                    return None;
                };
                Section::Table(TableSection {
                    title: raw.title.filter(|t| !t.is_empty()),
                    source,
                    columns: self.parse_columns(&columns),
                    max_rows: raw.max_rows,
                    show_total: raw.show_total.unwrap_or(false),
                    spacing: raw.spacing.unwrap_or(5.0),
                    sort: raw.sort.as_ref().map(parse_sort),
                    skip_when_empty: false,
                })
            }
            "summary" => Section::Summary(SummarySection {
                title: raw.title.unwrap_or_else(|| "Summary".to_string()),
                items: self.parse_summary_items(raw.items.as_deref().unwrap_or_default()),
            }),
            "spacer" => Section::Spacer(SpacerSection {
                height: raw.height.unwrap_or(5.0),
            }),
            other => {
                warn!("Section #{} has unknown type '{}'; it will render nothing", position, other);
                Section::Unknown(other.to_string())
            }
        };
        Some(section)
    }

    pub(crate) fn parse_columns(&self, list: &[Json]) -> Vec<ColumnDef> {
        list.iter()
            .filter_map(|json| {
                let raw: RawColumn = parse_fragment(json, "column")?;
                Some(self.column(raw))
            })
            .collect()
    }

    fn column(&self, raw: RawColumn) -> ColumnDef {
        let field = if raw.derived.as_deref() == Some("mpg") {
            "mpg".to_string()
        } else {
            raw.field.clone().or_else(|| raw.key.clone()).unwrap_or_default()
        };
        let aggregate = raw.aggregate.as_deref().and_then(|a| {
            let kind = AggregateKind::from_name(a);
            if kind.is_none() {
                warn!("Column '{}': unknown aggregate '{}'", field, a);
            }
            kind
        });
        ColumnDef {
            col: parse_column_ref(&raw.col, "column"),
            label: raw.label.or(raw.key).unwrap_or_default(),
            width: raw.width,
            format: raw.format.as_deref().map(ValueFormat::from_name).unwrap_or_default(),
            style: self.style(&raw.style),
            align: raw.alignment.as_deref().and_then(TextAlign::from_name),
            aggregate,
            field,
        }
    }

    fn parse_cells(&self, list: &[Json]) -> Vec<StaticCell> {
        list.iter()
            .filter_map(|json| parse_fragment::<RawCell>(json, "cell"))
            .map(|raw| StaticCell {
                col: parse_column_ref(&raw.col, "cell").unwrap_or(0),
                value: raw
                    .value
                    .as_ref()
                    .map(|v| Value::from_json(v).display_string())
                    .unwrap_or_default(),
                merge: raw.merge.as_deref().and_then(|m| {
                    let range = parse_range(m);
                    if range.is_none() {
                        warn!("Ignoring invalid merge range '{}'", m);
                    }
                    range
                }),
                style: self.style(&raw.style),
            })
            .collect()
    }

    fn parse_totals(&self, list: &[Json]) -> Vec<TotalsCell> {
        list.iter()
            .filter_map(|json| parse_fragment::<RawCell>(json, "totals cell"))
            .map(|raw| TotalsCell {
                col: parse_column_ref(&raw.col, "totals cell").unwrap_or(0),
                value: raw.value.as_ref().map(Value::from_json).unwrap_or_default(),
                label: raw.label.filter(|l| !l.is_empty()),
                format: raw.format.as_deref().map(ValueFormat::from_name).unwrap_or_default(),
                style: self.style(&raw.style),
            })
            .collect()
    }

    fn parse_detail_fields(&self, list: &[Json]) -> Vec<DetailField> {
        list.iter()
            .filter_map(|json| parse_fragment::<RawCell>(json, "detail field"))
            .map(|raw| DetailField {
                label: raw.label.unwrap_or_default(),
                field: raw.field.unwrap_or_default(),
                calculation: raw.calculation,
                format: raw.format.as_deref().map(ValueFormat::from_name).unwrap_or_default(),
            })
            .collect()
    }

    fn parse_summary_items(&self, list: &[Json]) -> Vec<SummaryItem> {
        list.iter()
            .filter_map(|json| parse_fragment::<RawCell>(json, "summary item"))
            .map(|raw| SummaryItem {
                label: raw.label.unwrap_or_default(),
                value: raw.value.as_ref().map(Value::from_json).unwrap_or_default(),
                format: raw.format.as_deref().map(ValueFormat::from_name).unwrap_or_default(),
                bold: raw.bold.unwrap_or(false),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_root_must_be_object() {
        assert!(matches!(
            Template::from_value(&json!([1, 2])),
            Err(TemplateError::NotAnObject("an array"))
        ));
        assert!(matches!(Template::from_json_str("{oops"), Err(TemplateError::Json(_))));
    }

    #[test]
    fn test_data_source_defaults_and_ordering() {
        let template = Template::from_value(&json!({
            "dataSources": {
                "vehicle": {},
                "parts": { "entity": "parts", "fields": { "item": "description", "cost": "price" } },
                "costs": { "merge": ["parts", "consumables"], "sort": { "order": "DESC" } },
                "broken": "not an object"
            }
        }))
        .unwrap();

        let names: Vec<&str> = template.data_sources.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["vehicle", "parts", "costs"]);
        assert_eq!(template.data_source("vehicle").unwrap().entity.as_deref(), Some("vehicle"));
        assert_eq!(
            template.data_source("parts").unwrap().fields,
            vec![
                ("item".to_string(), "description".to_string()),
                ("cost".to_string(), "price".to_string())
            ]
        );
        let costs = template.data_source("costs").unwrap();
        assert_eq!(costs.entity, None);
        assert_eq!(costs.sort, Some(SortSpec::new("date", SortOrder::Desc)));
    }

    #[test]
    fn test_calculation_defaults() {
        let template = Template::from_value(&json!({
            "calculations": {
                "total": { "source": "costs" },
                "economy": { "type": "average", "source": "fuelRecords", "field": "mpg" },
                "odd": { "type": "median", "source": "costs" }
            }
        }))
        .unwrap();

        let total = template.calculation("total").unwrap();
        assert_eq!(total.kind, CalculationKind::Sum);
        assert_eq!(total.field, "cost");
        assert_eq!(template.calculation("economy").unwrap().kind, CalculationKind::Avg);
        assert_eq!(
            template.calculation("odd").unwrap().kind,
            CalculationKind::Unknown("median".to_string())
        );
    }

    #[test]
    fn test_sections_resolve_letters_styles_and_aliases() {
        let template = Template::from_value(&json!({
            "styles": {
                "header": { "font": { "bold": true, "size": 12 }, "fill": { "color": "#B2B2B2" }, "border": "thin" }
            },
            "columnWidths": { "A": 12, "3": 20 },
            "layout": {
                "name": "Costs {{vehicle.registration}}",
                "sections": [
                    { "type": "header", "cells": [{ "col": "B", "value": "Title", "merge": "B1:F1", "style": "header" }] },
                    { "type": "dataGrid", "source": "costs", "startRow": 3,
                      "columns": [{ "col": "C", "key": "cost", "format": "currency" }] },
                    { "type": "vehicleDetails", "fields": [{ "label": "Reg", "field": "registration" }] },
                    { "type": "sparkline" },
                    { "type": "dataGrid" }
                ]
            }
        }))
        .unwrap();

        assert_eq!(template.column_widths, BTreeMap::from([(0, 12.0), (3, 20.0)]));
        let layout = template.layout.unwrap();
        assert_eq!(layout.sections.len(), 4);

        let Section::Cells(header) = &layout.sections[0] else { panic!("expected cells") };
        assert_eq!(header.cells[0].col, 1);
        assert_eq!(header.cells[0].merge.unwrap().last_col, 5);
        let style = header.cells[0].style.as_ref().unwrap();
        assert_eq!(style.bold, Some(true));
        assert_eq!(style.border, Some(BorderWeight::Thin));

        let Section::DataGrid(grid) = &layout.sections[1] else { panic!("expected dataGrid") };
        assert_eq!(grid.placement, Placement::pinned(3));
        assert_eq!(grid.max_rows, Some(1000));
        assert_eq!(grid.columns[0].col, Some(2));
        assert_eq!(grid.columns[0].field, "cost");
        assert_eq!(grid.columns[0].format, ValueFormat::Currency);

        let Section::Details(details) = &layout.sections[2] else { panic!("expected details") };
        assert_eq!((details.label_col, details.value_col), (20, 21));
        assert_eq!(details.source, "vehicle");

        assert_eq!(layout.sections[3], Section::Unknown("sparkline".to_string()));
    }

    #[test]
    fn test_rows_past_the_sheet_are_skipped() {
        let template = Template::from_value(&json!({
            "layout": { "sections": [
                { "type": "cells", "row": 4294967295u32, "cells": [{ "col": "A", "value": "lost" }] },
                { "type": "totals", "startRow": 1048577, "cells": [] },
                { "type": "cells", "row": 1048576, "cells": [{ "col": "A", "value": "last" }] }
            ] }
        }))
        .unwrap();

        let sections = template.layout.unwrap().sections;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].placement(), Placement::at_row(MAX_GRID_ROW));
    }

    #[test]
    fn test_pdf_layout_defaults_to_tables() {
        let template = Template::from_value(&json!({
            "pdfLayout": [
                { "source": "parts", "columns": [{ "field": "cost", "width": 25 }] },
                { "type": "summary", "items": [{ "label": "Total", "value": "{{total}}", "bold": true }] }
            ],
            "pageSetup": { "orientation": "Portrait" }
        }))
        .unwrap();

        let sections = template.pdf_layout.unwrap();
        assert!(matches!(&sections[0], Section::Table(t) if t.max_rows.is_none() && t.spacing == 5.0));
        let Section::Summary(summary) = &sections[1] else { panic!("expected summary") };
        assert_eq!(summary.title, "Summary");
        assert!(summary.items[0].bold);
        assert_eq!(template.page_setup.orientation, Orientation::Portrait);
    }

    #[test]
    fn test_legacy_columns_accept_key_and_derived() {
        let template = Template::from_value(&json!({
            "sheets": [
                { "name": "Fuel", "source": "fuelRecords",
                  "columns": [{ "key": "date", "label": "Date" }, { "label": "MPG", "derived": "mpg" }] },
                { "name": "No source" }
            ]
        }))
        .unwrap();

        assert_eq!(template.sheets.len(), 1);
        let columns = &template.sheets[0].columns;
        assert_eq!(columns[0].field, "date");
        assert_eq!(columns[1].field, "mpg");
        assert_eq!(columns[1].label, "MPG");
    }
}
