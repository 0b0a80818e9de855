//! End-to-end generation: templates in, workbook/PDF bytes out, read back
//! with calamine where the output is a workbook.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use pretty_assertions::assert_eq;
use serde_json::json;

use report_engine::{
    EntityQuery, InMemoryRepository, OutputFormat, Params, ReportEngine, ReportError, Repository,
    RepositoryError, Row, Template, Value,
};

fn repository() -> InMemoryRepository {
    InMemoryRepository::from_json(&json!({
        "vehicles": [
            { "id": 1, "registration": "AB12 CDE", "make": "Ford", "model": "Focus" },
            { "id": 2, "registration": "XY34 ZZZ", "make": "Vauxhall", "model": "Astra" }
        ],
        "parts": [
            { "vehicle_id": 1, "date": "2024-01-10", "description": "Brake pads", "cost": 45.0 },
            { "vehicle_id": 1, "date": "2024-03-05", "description": "Wiper blades", "cost": 15.0 },
            { "vehicle_id": 2, "date": "2024-02-20", "description": "Bulb", "cost": 4.0 }
        ],
        "consumables": [
            { "vehicle_id": 1, "date": "2024-02-01", "name": "Engine oil", "cost": 30.0 }
        ],
        "fuelRecords": [
            { "vehicle_id": 1, "date": "2024-02-01", "mileage": 10500, "litres": 40, "cost": 58.0 },
            { "vehicle_id": 1, "date": "2024-01-01", "mileage": 10000, "litres": 40, "cost": 56.0 },
            { "vehicle_id": 1, "date": "2024-03-01", "mileage": 11000, "litres": 40, "cost": 60.0 }
        ]
    }))
    .unwrap()
}

fn vehicle_params() -> Params {
    let mut params = Params::new();
    params.insert("vehicle_id".to_string(), Value::Number(1.0));
    params
}

fn costs_template() -> Template {
    Template::from_value(&json!({
        "name": "Vehicle costs",
        "title": "Costs for {{vehicle.registration}}",
        "filename": "costs {{vehicle.registration}}",
        "dataSources": {
            "vehicle": { "entity": "vehicles", "single": true },
            "parts": { "entity": "parts" },
            "consumables": { "entity": "consumables", "fields": { "description": "name" } },
            "costs": {
                "merge": ["parts", "consumables"],
                "sort": { "field": "date", "order": "asc" }
            }
        },
        "calculations": {
            "totalCost": { "type": "sum", "source": "costs", "field": "cost" },
            "itemCount": { "type": "count", "source": "costs" }
        },
        "layout": {
            "name": "Costs",
            "sections": [
                { "type": "header", "cells": [
                    { "col": "A", "value": "Cost report: {{vehicle.registration}}", "merge": "A1:C1" }
                ] },
                { "type": "dataGrid", "source": "costs", "columns": [
                    { "col": "A", "field": "date" },
                    { "col": "B", "field": "description" },
                    { "col": "C", "field": "cost", "format": "currency" }
                ] },
                { "type": "totals", "cells": [
                    { "col": "B", "label": "Total ({{itemCount}} items)" },
                    { "col": "C", "value": "{{totalCost}}", "format": "currency" }
                ] }
            ]
        }
    }))
    .unwrap()
}

fn read_workbook(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
    open_workbook_from_rs(Cursor::new(bytes)).unwrap()
}

fn text(s: &str) -> Data {
    Data::String(s.to_string())
}

#[test]
fn test_layout_template_to_workbook() {
    let engine = ReportEngine::new(repository());
    let output = engine
        .generate(&costs_template(), &vehicle_params(), OutputFormat::Xlsx)
        .unwrap();

    assert_eq!(output.filename, "costs_AB12_CDE.xlsx");
    assert_eq!(
        output.mime_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let mut workbook = read_workbook(output.content);
    assert_eq!(workbook.sheet_names(), vec!["Costs".to_string()]);
    let sheet = workbook.worksheet_range("Costs").unwrap();

    assert_eq!(sheet.get_value((0, 0)), Some(&text("Cost report: AB12 CDE")));

    // Merged members in date order; the other vehicle's part is out of scope.
    assert_eq!(sheet.get_value((1, 1)), Some(&text("Brake pads")));
    assert_eq!(sheet.get_value((2, 1)), Some(&text("Engine oil")));
    assert_eq!(sheet.get_value((3, 1)), Some(&text("Wiper blades")));
    assert_eq!(sheet.get_value((2, 2)), Some(&Data::Float(30.0)));

    assert_eq!(sheet.get_value((4, 1)), Some(&text("Total (3 items)")));
    assert_eq!(sheet.get_value((4, 2)), Some(&Data::Float(90.0)));
}

#[test]
fn test_legacy_sheets_to_workbook() {
    let template = Template::from_value(&json!({
        "name": "Fuel log",
        "sheets": [
            {
                "name": "Fuel",
                "source": "fuelRecords",
                "columns": [
                    { "key": "date", "label": "Date" },
                    { "key": "mileage", "label": "Mileage", "format": "number" },
                    { "key": "litres", "label": "Litres", "aggregate": "sum" },
                    { "key": "mpg", "label": "MPG" }
                ]
            },
            {
                "name": "Parts",
                "source": "parts",
                "columns": [
                    { "key": "description", "label": "Item" },
                    { "key": "cost", "label": "Cost", "format": "currency" }
                ]
            }
        ]
    }))
    .unwrap();

    let engine = ReportEngine::new(repository());
    let output = engine
        .generate(&template, &vehicle_params(), OutputFormat::from_name("xlsx"))
        .unwrap();
    assert_eq!(output.filename, "Fuel_log.xlsx");

    let mut workbook = read_workbook(output.content);
    assert_eq!(
        workbook.sheet_names(),
        vec!["Fuel".to_string(), "Parts".to_string()]
    );

    let fuel = workbook.worksheet_range("Fuel").unwrap();
    assert_eq!(fuel.get_value((0, 0)), Some(&text("Date")));
    assert_eq!(fuel.get_value((0, 3)), Some(&text("MPG")));
    // Fill-ups come back in date order with readings shown in miles.
    assert_eq!(fuel.get_value((1, 0)), Some(&text("2024-01-01")));
    assert_eq!(fuel.get_value((1, 1)), Some(&Data::Float(6214.0)));
    assert_eq!(fuel.get_value((2, 3)), Some(&Data::Float(35.31)));
    assert_eq!(fuel.get_value((4, 0)), Some(&text("Total")));
    assert_eq!(fuel.get_value((4, 2)), Some(&Data::Float(120.0)));

    let parts = workbook.worksheet_range("Parts").unwrap();
    assert_eq!(parts.get_value((1, 0)), Some(&text("Brake pads")));
    assert_eq!(parts.get_value((2, 1)), Some(&Data::Float(15.0)));
}

#[test]
fn test_pdf_output() {
    let engine = ReportEngine::new(repository());
    let template = Template::from_value(&json!({
        "name": "Service history",
        "dataSources": { "parts": {} },
        "calculations": { "spend": { "type": "sum", "source": "parts", "field": "cost" } },
        "pageSetup": { "orientation": "portrait" },
        "pdfLayout": [
            { "type": "title", "text": "Parts for {{distanceLabel}} report" },
            { "type": "table", "source": "parts", "showTotal": true, "columns": [
                { "field": "date", "label": "Date", "width": 30 },
                { "field": "description", "label": "Item", "width": 80 },
                { "field": "cost", "label": "Cost", "width": 30, "format": "currency" }
            ] },
            { "type": "summary", "items": [
                { "label": "Total spend", "value": "{{spend}}", "format": "currency" }
            ] }
        ]
    }))
    .unwrap();

    let output = engine
        .generate(&template, &vehicle_params(), OutputFormat::Pdf)
        .unwrap();

    assert_eq!(output.mime_type, "application/pdf");
    assert_eq!(output.filename, "Service_history.pdf");
    assert!(output.content.starts_with(b"%PDF-"));
    assert!(output.content.windows(5).any(|w| w == b"%%EOF"));
}

#[test]
fn test_generate_from_json_text() {
    let engine = ReportEngine::new(repository());
    let output = engine
        .generate_json(
            r#"{ "filename": "empty", "layout": { "sections": [ { "type": "mystery" } ] } }"#,
            &Params::new(),
            OutputFormat::Xlsx,
        )
        .unwrap();
    assert_eq!(output.filename, "empty.xlsx");

    let mut workbook = read_workbook(output.content);
    assert_eq!(workbook.sheet_names(), vec!["Report".to_string()]);
}

#[test]
fn test_invalid_template_text_is_an_error() {
    let engine = ReportEngine::new(repository());
    let result = engine.generate_json("[1, 2, 3]", &Params::new(), OutputFormat::Pdf);
    assert!(matches!(result, Err(ReportError::Template(_))));
}

struct OfflineRepository;

impl Repository for OfflineRepository {
    fn fetch_rows(&self, query: &EntityQuery) -> Result<Vec<Row>, RepositoryError> {
        Err(RepositoryError::Query {
            entity: query.entity.as_str().to_string(),
            message: "database is offline".to_string(),
        })
    }
}

#[test]
fn test_repository_failure_aborts_generation() {
    let engine = ReportEngine::new(OfflineRepository);
    let result = engine.generate(&costs_template(), &vehicle_params(), OutputFormat::Xlsx);
    match result {
        Err(ReportError::Repository(RepositoryError::Query { entity, .. })) => {
            assert_eq!(entity, "vehicles")
        }
        other => panic!("expected a repository error, got {:?}", other.map(|o| o.filename)),
    }
}

#[test]
fn test_context_is_not_shared_between_calls() {
    let engine = ReportEngine::new(repository());
    let template = costs_template();

    let first = engine.build_context(&template, &vehicle_params()).unwrap();
    let mut other_vehicle = Params::new();
    other_vehicle.insert("vehicle_id".to_string(), Value::Number(2.0));
    let second = engine.build_context(&template, &other_vehicle).unwrap();

    assert_eq!(first.calculation("totalCost"), Some(&Value::Number(90.0)));
    assert_eq!(second.calculation("totalCost"), Some(&Value::Number(4.0)));
    assert_eq!(second.resolve_string("{{vehicle.registration}}"), "XY34 ZZZ");
}

#[test]
fn test_section_past_last_row_is_skipped() {
    let engine = ReportEngine::new(repository());
    let output = engine
        .generate_json(
            r#"{ "layout": { "name": "Odd", "sections": [
                { "type": "cells", "row": 4294967295, "cells": [ { "col": "A", "value": "lost" } ] },
                { "type": "cells", "cells": [ { "col": "A", "value": "kept" } ] }
            ] } }"#,
            &Params::new(),
            OutputFormat::Xlsx,
        )
        .unwrap();

    let mut workbook = read_workbook(output.content);
    let sheet = workbook.worksheet_range("Odd").unwrap();
    assert_eq!(sheet.get_value((0, 0)), Some(&text("kept")));
}

#[test]
fn test_sort_over_mixed_references() {
    let repository = InMemoryRepository::from_json(&json!({
        "parts": [
            { "vehicle_id": 1, "ref": "10", "cost": 1.0 },
            { "vehicle_id": 1, "ref": "1a", "cost": 2.0 },
            { "vehicle_id": 1, "ref": "9", "cost": 3.0 },
            { "vehicle_id": 1, "ref": "B7", "cost": 4.0 }
        ]
    }))
    .unwrap();
    let template = Template::from_value(&json!({
        "dataSources": { "parts": { "sort": { "field": "ref", "order": "asc" } } }
    }))
    .unwrap();

    let ctx = ReportEngine::new(repository)
        .build_context(&template, &vehicle_params())
        .unwrap();
    let refs: Vec<String> = ctx
        .data("parts")
        .iter()
        .map(|r| r.value("ref").display_string())
        .collect();
    assert_eq!(refs, vec!["9", "10", "1a", "B7"]);
}
