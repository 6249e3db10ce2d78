//! Command-line coordinate parsing.

use thiserror::Error;

use crate::error::OctantError;
use crate::octant::OctantBox;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("expected \"lat1,lon1,lat2,lon2\", got {0:?}")]
    BboxFormat(String),

    #[error("expected two DMS coordinates like 43°43'23\"N 10°23'45\"E, got {0:?}")]
    DmsFormat(String),

    #[error(transparent)]
    Octant(#[from] OctantError),
}

/// Parse `"lat1,lon1,lat2,lon2"`; corners may be given in any order.
pub fn parse_bbox(input: &str) -> Result<OctantBox, CoordError> {
    let values: Vec<f64> = input
        .split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| CoordError::BboxFormat(input.to_owned()))?;
    let [lat1, lon1, lat2, lon2] = values[..] else {
        return Err(CoordError::BboxFormat(input.to_owned()));
    };
    Ok(OctantBox::from_corners((lat1, lon1), (lat2, lon2))?)
}

/// Parse one `D°M'S"H` component. Returns the signed degrees and the
/// hemisphere letter.
fn parse_dms_component(component: &str) -> Option<(f64, char)> {
    let (degrees, rest) = component.split_once('°')?;
    let (minutes, rest) = rest.split_once('\'')?;
    let rest = rest.trim_start();
    let hemisphere = rest.chars().last()?;
    let seconds = rest[..rest.len() - hemisphere.len_utf8()].trim_end_matches('"');

    let value = degrees.trim().parse::<f64>().ok()?
        + minutes.trim().parse::<f64>().ok()? / 60.0
        + seconds.trim().parse::<f64>().ok()? / 3600.0;
    match hemisphere.to_ascii_uppercase() {
        'N' | 'E' => Some((value, hemisphere.to_ascii_uppercase())),
        'S' | 'W' => Some((-value, hemisphere.to_ascii_uppercase())),
        _ => None,
    }
}

/// Parse a `lat lon` pair in degrees-minutes-seconds, for example
/// `43°43'23"N 10°23'45"E`. Returns `(lat, lon)` in decimal degrees.
pub fn parse_dms(input: &str) -> Result<(f64, f64), CoordError> {
    let error = || CoordError::DmsFormat(input.to_owned());
    let parts: Vec<&str> = input.split_whitespace().collect();
    let [lat, lon] = parts[..] else {
        return Err(error());
    };

    match (parse_dms_component(lat), parse_dms_component(lon)) {
        (Some((lat, 'N' | 'S')), Some((lon, 'E' | 'W'))) => Ok((lat, lon)),
        _ => Err(error()),
    }
}
