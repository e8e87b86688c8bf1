//! Data-driven style expressions.

use foundation::Rgba;
use foundation::color::ColorParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    NoStops,
    NonFiniteStop { index: usize },
    NotAscending { index: usize, input: f64, previous: f64 },
    Color(ColorParseError),
}

impl std::fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpressionError::NoStops => write!(f, "interpolate needs at least one stop"),
            ExpressionError::NonFiniteStop { index } => {
                write!(f, "stop {index} has a non-finite input")
            }
            ExpressionError::NotAscending {
                index,
                input,
                previous,
            } => write!(
                f,
                "stop inputs must be strictly ascending: stop {index} is {input} after {previous}"
            ),
            ExpressionError::Color(e) => write!(f, "bad stop color: {e}"),
        }
    }
}

impl std::error::Error for ExpressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExpressionError::Color(e) => Some(e),
            _ => None,
        }
    }
}

pub trait Lerp: Copy {
    fn lerp(a: Self, b: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Rgba {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        a.lerp(b, t as f32)
    }
}

/// `["interpolate", ["linear"], input, stop, output, ...]`.
///
/// Inputs below the first stop take the first output, inputs above the last
/// stop take the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolate<T> {
    stops: Vec<(f64, T)>,
}

impl<T: Lerp> Interpolate<T> {
    pub fn linear(stops: Vec<(f64, T)>) -> Result<Self, ExpressionError> {
        if stops.is_empty() {
            return Err(ExpressionError::NoStops);
        }
        for (index, (input, _)) in stops.iter().enumerate() {
            if !input.is_finite() {
                return Err(ExpressionError::NonFiniteStop { index });
            }
            if index > 0 {
                let previous = stops[index - 1].0;
                if *input <= previous {
                    return Err(ExpressionError::NotAscending {
                        index,
                        input: *input,
                        previous,
                    });
                }
            }
        }
        Ok(Self { stops })
    }

    pub fn stops(&self) -> &[(f64, T)] {
        &self.stops
    }

    /// Non-finite input evaluates to the first stop.
    pub fn evaluate(&self, input: f64) -> T {
        let (first_in, first_out) = self.stops[0];
        let (last_in, last_out) = self.stops[self.stops.len() - 1];
        if !input.is_finite() || input <= first_in {
            return first_out;
        }
        if input >= last_in {
            return last_out;
        }

        let upper = self.stops.partition_point(|(stop, _)| *stop <= input);
        let (a_in, a_out) = self.stops[upper - 1];
        let (b_in, b_out) = self.stops[upper];
        T::lerp(a_out, b_out, (input - a_in) / (b_in - a_in))
    }
}

impl Interpolate<Rgba> {
    pub fn from_hex_stops(stops: &[(f64, &str)]) -> Result<Self, ExpressionError> {
        let stops = stops
            .iter()
            .map(|(input, hex)| Ok((*input, Rgba::from_hex(hex).map_err(ExpressionError::Color)?)))
            .collect::<Result<Vec<_>, ExpressionError>>()?;
        Self::linear(stops)
    }
}
