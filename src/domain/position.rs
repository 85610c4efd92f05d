//! Signature placement parsed from the `page,x1,y1,x2,y2` wire format.

use crate::error::SignError;
use serde::Serialize;
use std::str::FromStr;

const POSITION_FIELDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Rectangle in page space, origin at the top left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub top_left: Point,
    pub bottom_right: Point,
}

/// Target page (zero-based) and rectangle for the signature widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSpec {
    pub page: i64,
    pub rect: Rectangle,
}

/// Parse a position string such as `"0,0,0,100,200"`.
///
/// The page index is not range checked; that needs the document's page count.
pub fn parse_position(spec: &str) -> Result<PositionSpec, SignError> {
    let fields: Vec<&str> = spec.split(',').map(str::trim).collect();
    if fields.len() != POSITION_FIELDS {
        return Err(SignError::wrong_field_count(spec));
    }

    let page = parse_field::<i64>(fields[0])?;
    let coords = [
        parse_field::<f64>(fields[1])?,
        parse_field::<f64>(fields[2])?,
        parse_field::<f64>(fields[3])?,
        parse_field::<f64>(fields[4])?,
    ];
    if coords.iter().any(|c| !c.is_finite()) {
        return Err(SignError::unparsable_position());
    }

    Ok(PositionSpec {
        page,
        rect: Rectangle {
            top_left: Point { x: coords[0], y: coords[1] },
            bottom_right: Point { x: coords[2], y: coords[3] },
        },
    })
}

fn parse_field<T: FromStr>(field: &str) -> Result<T, SignError> {
    field.parse::<T>().map_err(|_| SignError::unparsable_position())
}

impl FromStr for PositionSpec {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_position(s)
    }
}
