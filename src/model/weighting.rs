use crate::data::DataPoint;
use crate::error::AlignmentError;
use crate::params::{Params, ParamsReader};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DATUM_MIN: f64 = 1e-15;
pub const DEFAULT_DATUM_MAX: f64 = 1e15;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn symbol(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
        }
    }

    fn other(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

/// Function applied to one axis of the data before fitting
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeightFunction {
    /// `1 / |v|`
    Inverse,
    /// `1 / v²`
    InverseSquare,
    /// `ln v`
    Ln,
}

impl WeightFunction {
    fn apply(self, v: f64) -> f64 {
        match self {
            Self::Inverse => v.abs().recip(),
            Self::InverseSquare => v.powi(2).recip(),
            Self::Ln => v.ln(),
        }
    }

    fn invert(self, v: f64) -> f64 {
        match self {
            Self::Inverse => v.abs().recip(),
            Self::InverseSquare => v.abs().sqrt().recip(),
            Self::Ln => v.exp(),
        }
    }

    fn name(self, axis: Axis) -> String {
        let v = axis.symbol();
        match self {
            Self::Inverse => format!("1/{v}"),
            Self::InverseSquare => format!("1/{v}2"),
            Self::Ln => format!("ln({v})"),
        }
    }

    fn parse(s: &str, axis: Axis) -> Option<Option<Self>> {
        let v = axis.symbol();
        let s = s.trim();
        if s.is_empty() {
            return Some(None);
        }
        let aliases = [
            (Self::Inverse, vec![format!("1/{v}")]),
            (
                Self::InverseSquare,
                vec![format!("1/{v}2"), format!("1/{v}^2"), format!("1/{v}²")],
            ),
            (Self::Ln, vec![format!("ln({v})"), format!("ln {v}")]),
        ];
        aliases
            .into_iter()
            .find(|(_, names)| names.iter().any(|name| name == s))
            .map(|(func, _)| Some(func))
    }
}

/// Weighting of a single axis: clamp to `[datum_min, datum_max]`, then apply `function`
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AxisWeighting {
    pub function: Option<WeightFunction>,
    pub datum_min: f64,
    pub datum_max: f64,
}

impl Default for AxisWeighting {
    fn default() -> Self {
        Self {
            function: None,
            datum_min: DEFAULT_DATUM_MIN,
            datum_max: DEFAULT_DATUM_MAX,
        }
    }
}

impl AxisWeighting {
    fn from_reader(reader: &mut ParamsReader, axis: Axis) -> Result<Self, AlignmentError> {
        let v = axis.symbol();
        let weight_key = format!("{v}_weight");
        let function = match reader.take_text(&weight_key)? {
            None => None,
            Some(name) => WeightFunction::parse(&name, axis).ok_or_else(|| {
                AlignmentError::invalid_choice(
                    weight_key.as_str(),
                    &name,
                    Weighting::valid_weights(axis).iter().map(String::as_str),
                )
            })?,
        };
        let datum_min = reader
            .take_f64(&format!("{v}_datum_min"))?
            .unwrap_or(DEFAULT_DATUM_MIN);
        let datum_max = reader
            .take_f64(&format!("{v}_datum_max"))?
            .unwrap_or(DEFAULT_DATUM_MAX);
        if !(datum_min <= datum_max) {
            return Err(AlignmentError::invalid_value(
                format!("{v}_datum_min"),
                format!("{datum_min} > {v}_datum_max = {datum_max}"),
            ));
        }
        Ok(Self {
            function,
            datum_min,
            datum_max,
        })
    }

    fn write(&self, params: &mut Params, axis: Axis) {
        let v = axis.symbol();
        params.insert(
            format!("{v}_weight"),
            self.function.map(|f| f.name(axis)).unwrap_or_default(),
        );
        params.insert(format!("{v}_datum_min"), self.datum_min);
        params.insert(format!("{v}_datum_max"), self.datum_max);
    }

    /// Clamped and weighted value; the identity when no weight function is set
    pub fn weight(&self, datum: f64) -> f64 {
        match self.function {
            None => datum,
            Some(f) => f.apply(datum.clamp(self.datum_min, self.datum_max)),
        }
    }

    pub fn unweight(&self, datum: f64) -> f64 {
        match self.function {
            None => datum,
            Some(f) => f.invert(datum),
        }
    }
}

/// Weighting configuration of both axes, shared by all fitted models
///
/// Recognized keys: `x_weight`, `y_weight` (see [Weighting::valid_x_weights] and
/// [Weighting::valid_y_weights]), `x_datum_min`, `x_datum_max`, `y_datum_min`, `y_datum_max`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Weighting {
    pub x: AxisWeighting,
    pub y: AxisWeighting,
}

impl Weighting {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_reader(reader: &mut ParamsReader) -> Result<Self, AlignmentError> {
        Ok(Self {
            x: AxisWeighting::from_reader(reader, Axis::X)?,
            y: AxisWeighting::from_reader(reader, Axis::Y)?,
        })
    }

    pub fn from_params(params: &Params) -> Result<Self, AlignmentError> {
        let mut reader = params.reader();
        let weighting = Self::from_reader(&mut reader)?;
        reader.finish()?;
        Ok(weighting)
    }

    pub fn write_params(&self, params: &mut Params) {
        self.x.write(params, Axis::X);
        self.y.write(params, Axis::Y);
    }

    pub fn is_unweighted(&self) -> bool {
        self.x.function.is_none() && self.y.function.is_none()
    }

    fn valid_weights(axis: Axis) -> Vec<String> {
        std::iter::once(String::new())
            .chain(
                [
                    WeightFunction::Inverse,
                    WeightFunction::InverseSquare,
                    WeightFunction::Ln,
                ]
                .into_iter()
                .map(|f| f.name(axis)),
            )
            .collect()
    }

    /// Canonical names accepted by `x_weight`, the empty string means no weighting
    pub fn valid_x_weights() -> Vec<String> {
        Self::valid_weights(Axis::X)
    }

    /// Canonical names accepted by `y_weight`, the empty string means no weighting
    pub fn valid_y_weights() -> Vec<String> {
        Self::valid_weights(Axis::Y)
    }

    pub fn weight_datum(&self, datum: f64, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x.weight(datum),
            Axis::Y => self.y.weight(datum),
        }
    }

    pub fn unweight_datum(&self, datum: f64, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x.unweight(datum),
            Axis::Y => self.y.unweight(datum),
        }
    }

    /// Copy of `data` with both axes weighted, notes are preserved
    pub fn weight_data(&self, data: &[DataPoint]) -> Vec<DataPoint> {
        data.iter()
            .map(|p| DataPoint {
                source: self.x.weight(p.source),
                target: self.y.weight(p.target),
                note: p.note.clone(),
            })
            .collect()
    }

    /// Weighting for the inverse mapping: the x configuration becomes the y one and vice versa
    pub fn swapped(&self) -> Self {
        Self {
            x: self.y.clone(),
            y: self.x.clone(),
        }
    }
}

impl FromStr for Axis {
    type Err = AlignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            _ => Err(AlignmentError::invalid_choice("axis", s, ["x", "y"])),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Rewrite weighting keys of fit parameters for the inverse mapping
pub(crate) fn swap_weighting_params(params: &Params) -> Params {
    params
        .iter()
        .map(|(key, value)| {
            let swapped_key = match key.split_once('_') {
                Some((v @ ("x" | "y"), rest)) if is_weighting_key(rest) => {
                    let axis: Axis = v.parse().unwrap_or(Axis::X);
                    format!("{}_{rest}", axis.other().symbol())
                }
                _ => key.to_owned(),
            };
            let swapped_value = match (key.split_once('_'), value) {
                (Some((v @ ("x" | "y"), "weight")), crate::params::ParamValue::Text(name)) => {
                    let axis: Axis = v.parse().unwrap_or(Axis::X);
                    match WeightFunction::parse(name, axis) {
                        Some(Some(func)) => func.name(axis.other()).into(),
                        _ => value.clone(),
                    }
                }
                _ => value.clone(),
            };
            (swapped_key, swapped_value)
        })
        .collect()
}

fn is_weighting_key(rest: &str) -> bool {
    matches!(rest, "weight" | "datum_min" | "datum_max")
}
