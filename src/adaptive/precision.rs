//! Output rounding. Engine math runs at full precision; values are rounded
//! only when they leave the engine through serialization.

use serde::Serializer;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

pub fn round3(value: f64) -> f64 {
    round_to(value, 3)
}

pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

pub fn ser_round3<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round3(*value))
}

pub fn ser_round4<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round4(*value))
}

pub fn ser_round3_opt<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&round3(*v)),
        None => serializer.serialize_none(),
    }
}

pub fn ser_round4_vec<S: Serializer>(values: &[Vec<f64>], serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for row in values {
        let rounded: Vec<f64> = row.iter().map(|v| round4(*v)).collect();
        seq.serialize_element(&rounded)?;
    }
    seq.end()
}
