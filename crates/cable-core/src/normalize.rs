//! Coercion of caller-supplied, heterogeneously-shaped points into the
//! canonical [`Point`] form.

use serde_json::Value;

use crate::error::CoreError;
use crate::point::Point;

/// Normalize a heterogeneous list of caller-supplied points.
///
/// Accepts, per element:
/// - an object with `x`, `y`, and optional `penDown` keys;
/// - a 3-element array `[x, y, penDown]`;
/// - a 2-element array `[x, y]` (`penDown` defaults to `false`).
///
/// Eager and total: the first unrecognizable or non-finite element aborts
/// the whole call before any point is returned, so job construction never
/// observes a partially-normalized list.
pub fn normalize_points(values: &[Value]) -> Result<Vec<Point>, CoreError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| normalize_one(value).map_err(|msg| CoreError::invalid(format!("point {index}: {msg}"))))
        .collect()
}

fn normalize_one(value: &Value) -> Result<Point, String> {
    match value {
        Value::Object(map) => {
            let x = extract_coordinate(map.get("x"), "x")?;
            let y = extract_coordinate(map.get("y"), "y")?;
            let pen_down = map.get("penDown").and_then(Value::as_bool).unwrap_or(false);
            finite_point(x, y, pen_down)
        }
        Value::Array(items) => match items.as_slice() {
            [x, y] => {
                let x = extract_coordinate(Some(x), "x")?;
                let y = extract_coordinate(Some(y), "y")?;
                finite_point(x, y, false)
            }
            [x, y, pen_down] => {
                let x = extract_coordinate(Some(x), "x")?;
                let y = extract_coordinate(Some(y), "y")?;
                let pen_down = pen_down.as_bool().unwrap_or(false);
                finite_point(x, y, pen_down)
            }
            other => Err(format!("array of length {} is not a recognized point shape", other.len())),
        },
        other => Err(format!("unrecognized point shape: {other}")),
    }
}

fn extract_coordinate(value: Option<&Value>, name: &str) -> Result<f64, String> {
    let value = value.ok_or_else(|| format!("missing '{name}' coordinate"))?;
    value
        .as_f64()
        .ok_or_else(|| format!("'{name}' coordinate is not a finite number"))
}

fn finite_point(x: f64, y: f64, pen_down: bool) -> Result<Point, String> {
    let point = Point::new(x, y, pen_down);
    if !point.is_finite() {
        return Err("coordinates must be finite".to_string());
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_object_form() {
        let values = vec![json!({"x": 1.0, "y": 2.0, "penDown": true})];
        let points = normalize_points(&values).unwrap();
        assert_eq!(points, vec![Point::new(1.0, 2.0, true)]);
    }

    #[test]
    fn object_form_defaults_pen_down_to_false() {
        let values = vec![json!({"x": 1.0, "y": 2.0})];
        let points = normalize_points(&values).unwrap();
        assert_eq!(points, vec![Point::new(1.0, 2.0, false)]);
    }

    #[test]
    fn normalizes_triple_form() {
        let values = vec![json!([3.0, 4.0, true])];
        let points = normalize_points(&values).unwrap();
        assert_eq!(points, vec![Point::new(3.0, 4.0, true)]);
    }

    #[test]
    fn normalizes_pair_form() {
        let values = vec![json!([5.0, 6.0])];
        let points = normalize_points(&values).unwrap();
        assert_eq!(points, vec![Point::new(5.0, 6.0, false)]);
    }

    #[test]
    fn rejects_missing_coordinate() {
        let values = vec![json!({"x": 1.0})];
        assert!(normalize_points(&values).is_err());
    }

    #[test]
    fn rejects_non_numeric_coordinate() {
        let values = vec![json!({"x": "oops", "y": 1.0})];
        assert!(normalize_points(&values).is_err());
    }

    #[test]
    fn rejects_unrecognized_shape() {
        let values = vec![json!("not a point")];
        assert!(normalize_points(&values).is_err());
    }

    #[test]
    fn rejects_wrong_length_array() {
        let values = vec![json!([1.0])];
        assert!(normalize_points(&values).is_err());
    }

    #[test]
    fn aborts_eagerly_on_first_bad_element() {
        let values = vec![json!({"x": 1.0, "y": 1.0}), json!("bad")];
        let err = normalize_points(&values).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("point 1")));
    }
}
