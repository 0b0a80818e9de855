//! FILENAME: report-template/src/normalize.rs
//! PURPOSE: Turns either template shape into the section list a renderer walks.
//! CONTEXT: Current templates carry `layout.sections` (grid) and `pdfLayout`
//! (flow). Older templates carry `sheets`, one flat table per worksheet. Both
//! shapes come out of here as `Section`s, so renderers never look at `sheets`.

use std::collections::BTreeMap;

use report_core::{CellStyle, Color, TextAlign};

use crate::model::*;

/// Legacy flow tables show at most this many rows.
const LEGACY_FLOW_MAX_ROWS: usize = 30;
/// Legacy flow column widths are capped at this many millimetres.
const LEGACY_FLOW_MAX_WIDTH: f64 = 60.0;

impl Template {
    /// Worksheets for the grid backend.
    ///
    /// `layout` wins when present and becomes a single page; otherwise every
    /// legacy sheet becomes its own page. `header_fill` colours legacy header rows.
    pub fn grid_pages(&self, header_fill: Color) -> Vec<LayoutPage> {
        if let Some(layout) = &self.layout {
            return vec![LayoutPage {
                name: layout.name.clone().unwrap_or_else(|| "Report".to_string()),
                column_widths: self.column_widths.clone(),
                sections: layout.sections.clone(),
            }];
        }

        let header_style = banner_style(header_fill);
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, sheet)| legacy_sheet_page(sheet, i, &header_style))
            .collect()
    }

    /// Section list for the flow backend: `pdfLayout`, else `layout`, else legacy sheets.
    pub fn flow_sections(&self) -> Vec<Section> {
        if let Some(sections) = &self.pdf_layout {
            return sections.clone();
        }
        if let Some(layout) = &self.layout {
            return layout.sections.clone();
        }
        self.sheets.iter().map(legacy_sheet_table).collect()
    }

    /// Every data source a legacy sheet reads from, in sheet order, without duplicates.
    pub fn legacy_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for sheet in &self.sheets {
            if !sources.contains(&sheet.source.as_str()) {
                sources.push(&sheet.source);
            }
        }
        sources
    }
}

/// Header row of labels, then an unlimited grid with columns in consecutive letters.
fn legacy_sheet_page(sheet: &LegacySheet, index: usize, header_style: &CellStyle) -> LayoutPage {
    let columns: Vec<ColumnDef> = sheet
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| ColumnDef {
            col: Some(i as u32),
            ..column.clone()
        })
        .collect();

    let header = CellsSection {
        placement: Placement::default(),
        cells: columns
            .iter()
            .enumerate()
            .map(|(i, column)| StaticCell {
                col: i as u32,
                value: column.label.clone(),
                merge: None,
                style: Some(header_style.clone()),
            })
            .collect(),
    };

    let column_widths: BTreeMap<u32, f64> = columns
        .iter()
        .enumerate()
        .filter_map(|(i, column)| column.width.map(|w| (i as u32, w)))
        .collect();

    LayoutPage {
        name: sheet
            .name
            .clone()
            .unwrap_or_else(|| format!("Sheet{}", index + 1)),
        column_widths,
        sections: vec![
            Section::Cells(header),
            Section::DataGrid(DataGridSection {
                placement: Placement::default(),
                source: sheet.source.clone(),
                columns,
                max_rows: None,
                overflow: None,
                sort: sheet.sort.clone(),
            }),
        ],
    }
}

fn legacy_sheet_table(sheet: &LegacySheet) -> Section {
    let columns = sheet
        .columns
        .iter()
        .map(|column| ColumnDef {
            width: column.width.map(|w| w.min(LEGACY_FLOW_MAX_WIDTH)),
            align: column.align.or(Some(TextAlign::Left)),
            ..column.clone()
        })
        .collect();

    Section::Table(TableSection {
        title: sheet.name.clone().filter(|n| !n.is_empty()),
        source: sheet.source.clone(),
        columns,
        max_rows: Some(LEGACY_FLOW_MAX_ROWS),
        show_total: sheet.columns.iter().any(|c| c.aggregate.is_some()),
        spacing: 5.0,
        sort: sheet.sort.clone(),
        skip_when_empty: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const GREY: Color = Color::new(178, 178, 178);

    fn legacy_template() -> Template {
        Template::from_value(&json!({
            "name": "Vehicle costs",
            "sheets": [
                { "name": "Parts", "source": "parts", "sort": { "field": "date", "order": "desc" },
                  "columns": [
                      { "key": "date", "label": "Date", "width": 12 },
                      { "key": "cost", "label": "Cost", "width": 80, "format": "currency", "aggregate": "sum" }
                  ] },
                { "source": "parts", "columns": [{ "key": "item" }] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_legacy_sheet_becomes_header_and_grid() {
        let pages = legacy_template().grid_pages(GREY);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].name, "Parts");
        assert_eq!(pages[1].name, "Sheet2");
        assert_eq!(pages[0].column_widths, BTreeMap::from([(0, 12.0), (1, 80.0)]));

        let Section::Cells(header) = &pages[0].sections[0] else { panic!("expected header cells") };
        let labels: Vec<&str> = header.cells.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(labels, vec!["Date", "Cost"]);
        assert_eq!(header.cells[1].style, Some(banner_style(GREY)));

        let Section::DataGrid(grid) = &pages[0].sections[1] else { panic!("expected grid") };
        assert_eq!(grid.max_rows, None);
        assert_eq!(grid.columns[1].col, Some(1));
        assert_eq!(grid.columns[1].aggregate, Some(AggregateKind::Sum));
        assert!(grid.sort.is_some());
    }

    #[test]
    fn test_legacy_sheet_becomes_flow_table() {
        let sections = legacy_template().flow_sections();
        let Section::Table(table) = &sections[0] else { panic!("expected table") };
        assert_eq!(table.title.as_deref(), Some("Parts"));
        assert_eq!(table.max_rows, Some(30));
        assert!(table.show_total);
        assert!(table.skip_when_empty);
        assert_eq!(table.columns[1].width, Some(60.0));
        assert_eq!(table.columns[0].align, Some(TextAlign::Left));

        let Section::Table(second) = &sections[1] else { panic!("expected table") };
        assert!(!second.show_total);
        assert_eq!(second.title, None);
    }

    #[test]
    fn test_layout_wins_over_sheets() {
        let template = Template::from_value(&json!({
            "layout": { "sections": [{ "type": "spacer" }] },
            "pdfLayout": [{ "type": "title", "text": "Hi" }],
            "sheets": [{ "source": "parts", "columns": [] }]
        }))
        .unwrap();

        let pages = template.grid_pages(GREY);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].name, "Report");
        assert!(matches!(template.flow_sections()[0], Section::Title(_)));
        assert_eq!(template.legacy_sources(), vec!["parts"]);
    }
}
