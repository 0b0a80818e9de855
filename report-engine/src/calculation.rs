//! FILENAME: report-engine/src/calculation.rs
//! PURPOSE: Evaluates named aggregate calculations over resolved data sources.
//! CONTEXT: Runs once every data source (and the derived-metric pass) is in
//! the context. Evaluation never fails: unknown types and empty sources have
//! fixed fallbacks.

use log::{debug, warn};

use report_core::{RenderContext, Row, Value};
use report_template::{CalculationConfig, CalculationKind, Template};

/// Evaluates one calculation over `rows`.
pub fn evaluate(config: &CalculationConfig, rows: &[Row]) -> Value {
    let field = config.field.as_str();

    match &config.kind {
        CalculationKind::Sum => Value::Number(numbers(rows, field).sum()),
        CalculationKind::Avg | CalculationKind::AvgPositive => {
            let positive: Vec<f64> = rows
                .iter()
                .filter_map(|row| row.value(field).as_number())
                .filter(|n| *n > 0.0)
                .collect();
            Value::Number(mean_of(&positive))
        }
        CalculationKind::Mean => Value::Number(mean_of(&numbers(rows, field).collect::<Vec<_>>())),
        CalculationKind::Count => Value::Number(rows.len() as f64),
        CalculationKind::Min => Value::Number(numbers(rows, field).reduce(f64::min).unwrap_or(0.0)),
        CalculationKind::Max => Value::Number(numbers(rows, field).reduce(f64::max).unwrap_or(0.0)),
        CalculationKind::First => rows.first().map(|r| r.value(field).clone()).unwrap_or_default(),
        CalculationKind::Last => rows.last().map(|r| r.value(field).clone()).unwrap_or_default(),
        CalculationKind::Unknown(kind) => {
            warn!("Unknown calculation type '{}'", kind);
            Value::Null
        }
    }
}

/// Field values with missing and unparseable entries read as 0.
fn numbers<'r>(rows: &'r [Row], field: &'r str) -> impl Iterator<Item = f64> + 'r {
    rows.iter().map(move |row| row.value(field).to_number_lossy())
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Evaluates every declared calculation into `ctx`, in declaration order.
pub fn evaluate_all(template: &Template, ctx: &mut RenderContext) {
    for (name, config) in &template.calculations {
        let value = evaluate(config, ctx.data(&config.source));
        debug!(
            "calculation '{}' ({:?} of {}.{}) = {:?}",
            name, config.kind, config.source, config.field, value
        );
        ctx.set_calculation(name.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use report_core::Params;

    fn calc(kind: CalculationKind, field: &str) -> CalculationConfig {
        CalculationConfig {
            kind,
            source: "rows".to_string(),
            field: field.to_string(),
        }
    }

    fn rows(field: &str, values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| Row::from_pairs([(field, v)]))
            .collect()
    }

    fn costs() -> Vec<Row> {
        rows("cost", [10.0, 20.0, 15.0, 5.0, 25.0].map(Value::Number).to_vec())
    }

    #[test]
    fn test_sum() {
        assert_eq!(evaluate(&calc(CalculationKind::Sum, "cost"), &costs()), Value::Number(75.0));
    }

    #[test]
    fn test_sum_coerces_missing_and_text() {
        let data = rows("cost", vec![Value::Null, Value::text("12.5"), Value::text("n/a")]);
        assert_eq!(evaluate(&calc(CalculationKind::Sum, "cost"), &data), Value::Number(12.5));
    }

    #[test]
    fn test_avg_skips_null_and_non_positive() {
        let data = rows(
            "economy",
            vec![Value::Null, Value::Number(0.0), Value::Number(8.5), Value::Number(9.0)],
        );
        assert_eq!(evaluate(&calc(CalculationKind::Avg, "economy"), &data), Value::Number(8.75));
        assert_eq!(
            evaluate(&calc(CalculationKind::AvgPositive, "economy"), &data),
            Value::Number(8.75)
        );
    }

    #[test]
    fn test_avg_without_qualifying_values_is_zero() {
        let data = rows("economy", vec![Value::Null, Value::Number(-3.0)]);
        assert_eq!(evaluate(&calc(CalculationKind::Avg, "economy"), &data), Value::Number(0.0));
    }

    #[test]
    fn test_mean_counts_every_row() {
        let data = rows("cost", vec![Value::Null, Value::Number(0.0), Value::Number(9.0)]);
        assert_eq!(evaluate(&calc(CalculationKind::Mean, "cost"), &data), Value::Number(3.0));
    }

    #[test]
    fn test_count_min_max() {
        assert_eq!(evaluate(&calc(CalculationKind::Count, "cost"), &costs()), Value::Number(5.0));
        assert_eq!(evaluate(&calc(CalculationKind::Min, "cost"), &costs()), Value::Number(5.0));
        assert_eq!(evaluate(&calc(CalculationKind::Max, "cost"), &costs()), Value::Number(25.0));
        assert_eq!(evaluate(&calc(CalculationKind::Max, "cost"), &[]), Value::Number(0.0));
    }

    #[test]
    fn test_min_treats_missing_as_zero() {
        let data = rows("cost", vec![Value::Number(4.0), Value::Null]);
        assert_eq!(evaluate(&calc(CalculationKind::Min, "cost"), &data), Value::Number(0.0));
    }

    #[test]
    fn test_first_last() {
        let data = rows("date", vec![Value::text("2024-01-01"), Value::text("2024-06-30")]);
        assert_eq!(
            evaluate(&calc(CalculationKind::First, "date"), &data),
            Value::text("2024-01-01")
        );
        assert_eq!(
            evaluate(&calc(CalculationKind::Last, "date"), &data),
            Value::text("2024-06-30")
        );
        assert_eq!(evaluate(&calc(CalculationKind::Last, "date"), &[]), Value::Null);
    }

    #[test]
    fn test_unknown_type_is_null() {
        let config = calc(CalculationKind::Unknown("median".to_string()), "cost");
        assert_eq!(evaluate(&config, &costs()), Value::Null);
    }

    #[test]
    fn test_evaluate_all_reads_context() {
        let mut template = Template::default();
        template
            .calculations
            .push(("totalCost".to_string(), calc(CalculationKind::Sum, "cost")));
        template.calculations.push((
            "missing".to_string(),
            CalculationConfig {
                source: "nowhere".to_string(),
                ..calc(CalculationKind::Count, "cost")
            },
        ));

        let mut ctx = RenderContext::new(Params::new());
        ctx.set_data("rows", costs());
        evaluate_all(&template, &mut ctx);

        assert_eq!(ctx.calculation("totalCost"), Some(&Value::Number(75.0)));
        assert_eq!(ctx.calculation("missing"), Some(&Value::Number(0.0)));
    }
}
