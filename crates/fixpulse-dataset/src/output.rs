use std::fmt::Write;

use fixpulse_core::{DatasetFormat, FixPulseError};

use crate::schema::{AttributeType, Schema};
use crate::sink::{Dataset, Row};

/// Render `dataset` in `format`.
///
/// # Errors
///
/// Returns [`FixPulseError::Serialization`] if JSON encoding fails.
///
/// # Examples
///
/// ```
/// use fixpulse_core::DatasetFormat;
/// use fixpulse_dataset::output::format_dataset;
/// use fixpulse_dataset::schema::Schema;
/// use fixpulse_dataset::sink::Dataset;
///
/// let mut schema = Schema::new();
/// schema.add_numeric("numCommits");
/// let out = format_dataset(&Dataset::new(schema), DatasetFormat::Csv, "r").unwrap();
/// assert_eq!(out, "numCommits\n");
/// ```
pub fn format_dataset(
    dataset: &Dataset,
    format: DatasetFormat,
    relation: &str,
) -> Result<String, FixPulseError> {
    match format {
        DatasetFormat::Arff => Ok(format_arff(dataset, relation)),
        DatasetFormat::Csv => Ok(format_csv(dataset)),
        DatasetFormat::JsonLines => format_jsonl(dataset),
    }
}

/// Render as a Weka ARFF file. Unset feature values are written as `?`.
pub fn format_arff(dataset: &Dataset, relation: &str) -> String {
    let schema = dataset.schema();
    let mut out = String::new();

    let _ = writeln!(out, "@relation {}\n", arff_quote(relation));
    for attribute in schema.columns() {
        let kind = match &attribute.kind {
            AttributeType::Numeric => "numeric".to_string(),
            AttributeType::Nominal(values) => format!(
                "{{{}}}",
                values.iter().map(|v| arff_quote(v)).collect::<Vec<_>>().join(",")
            ),
        };
        let _ = writeln!(out, "@attribute {} {kind}", arff_quote(&attribute.name));
    }

    let _ = writeln!(out, "\n@data");
    for row in dataset.rows() {
        let _ = writeln!(out, "{}", row_cells(schema, row, "?").join(","));
    }
    out
}

/// Render as CSV with a header row. Unset feature values are left empty.
pub fn format_csv(dataset: &Dataset) -> String {
    let schema = dataset.schema();
    let mut out = String::new();

    let header: Vec<String> = schema.columns().map(|a| csv_quote(&a.name)).collect();
    let _ = writeln!(out, "{}", header.join(","));
    for row in dataset.rows() {
        let _ = writeln!(out, "{}", row_cells(schema, row, "").join(","));
    }
    out
}

/// Render one JSON object per row, with `entity` and `chunk` metadata.
///
/// # Errors
///
/// Returns [`FixPulseError::Serialization`] if encoding fails.
pub fn format_jsonl(dataset: &Dataset) -> Result<String, FixPulseError> {
    let schema = dataset.schema();
    let mut out = String::new();

    for row in dataset.rows() {
        let mut object = serde_json::Map::new();
        object.insert("entity".into(), row.vector.entity.clone().into());
        object.insert("chunk".into(), row.vector.chunk.into());
        for name in schema.feature_names() {
            let value = row
                .vector
                .get(name)
                .map_or(serde_json::Value::Null, serde_json::Value::from);
            object.insert(name.to_string(), value);
        }
        if let Some(class) = schema.class() {
            object.insert(class.name.clone(), row.label.as_str().into());
        }
        let _ = writeln!(out, "{}", serde_json::to_string(&object)?);
    }
    Ok(out)
}

fn row_cells(schema: &Schema, row: &Row, missing: &str) -> Vec<String> {
    let mut cells: Vec<String> = schema
        .feature_names()
        .map(|name| {
            row.vector
                .get(name)
                .map_or_else(|| missing.to_string(), format_number)
        })
        .collect();
    if schema.class().is_some() {
        cells.push(row.label.as_str().to_string());
    }
    cells
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn arff_quote(s: &str) -> String {
    if s.chars().any(|c| c.is_whitespace() || ",{}%'\"".contains(c)) {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        s.to_string()
    }
}

fn csv_quote(s: &str) -> String {
    if s.contains(|c: char| matches!(c, ',' | '"' | '\n')) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FeatureVector, Label, CLASS_ATTRIBUTE};
    use crate::sink::DatasetSink;

    fn sample() -> Dataset {
        let mut schema = Schema::new();
        schema.add_numeric("numCommits").add_numeric("changeGini");
        schema.set_class(CLASS_ATTRIBUTE, &Label::values());
        let mut dataset = Dataset::new(schema);

        let mut first = FeatureVector::new("src/A.java", 0);
        first.set("numCommits", 1.0).set("changeGini", 0.0);
        dataset.emit(first, Label::Fixed).unwrap();

        let mut second = FeatureVector::new("src/A.java", 1);
        second.set("numCommits", 2.0).set("changeGini", 0.25);
        dataset.emit(second, Label::Unfixed).unwrap();
        dataset
    }

    #[test]
    fn arff_has_header_and_data() {
        let out = format_arff(&sample(), "my dataset");
        assert!(out.starts_with("@relation 'my dataset'\n"));
        assert!(out.contains("@attribute numCommits numeric\n"));
        assert!(out.contains("@attribute isFixed {true,false}\n"));
        assert!(out.contains("@data\n1,0,true\n2,0.25,false\n"));
    }

    #[test]
    fn arff_marks_missing_values() {
        let mut dataset = sample();
        let mut partial = FeatureVector::new("B", 0);
        partial.set("numCommits", 3.0);
        dataset.emit(partial, Label::Fixed).unwrap();
        let out = format_arff(&dataset, "r");
        assert!(out.ends_with("3,?,true\n"));
    }

    #[test]
    fn csv_has_header_row() {
        let out = format_csv(&sample());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["numCommits,changeGini,isFixed", "1,0,true", "2,0.25,false"]);
    }

    #[test]
    fn jsonl_has_one_object_per_row() {
        let out = format_jsonl(&sample()).unwrap();
        let rows: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["entity"], "src/A.java");
        assert_eq!(rows[1]["chunk"], 1);
        assert_eq!(rows[1]["changeGini"], 0.25);
        assert_eq!(rows[1]["isFixed"], "false");
    }

    #[test]
    fn format_dataset_dispatches() {
        let dataset = sample();
        assert!(format_dataset(&dataset, DatasetFormat::Arff, "r")
            .unwrap()
            .starts_with("@relation"));
        assert!(format_dataset(&dataset, DatasetFormat::Csv, "r")
            .unwrap()
            .starts_with("numCommits"));
        assert!(format_dataset(&dataset, DatasetFormat::JsonLines, "r")
            .unwrap()
            .starts_with('{'));
    }

    #[test]
    fn quoting_rules() {
        assert_eq!(arff_quote("plain"), "plain");
        assert_eq!(arff_quote("it's"), "'it\\'s'");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn numbers_drop_trailing_zero_fraction() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.625), "0.625");
    }
}
