// src/sweep.rs
//! Sweep axes and expansion of a [`RunSpecification`] into concrete runs.
//!
//! Any sweep-capable field holds the literal text the user gave, e.g.
//! `"1M,4M,16M"`. Expansion takes the Cartesian product of every axis in a
//! fixed order so that a sweep always runs in the same sequence:
//!
//! 1. run type sub-axes (runtime, ramp-up, ramp-down / op count)
//! 2. backend sub-axes (worker count / bandwidth limit, worker factor)
//! 3. protocol variants
//! 4. object size
//! 5. object count
//! 6. read/write mix
//!
//! Earlier axes vary slowest. Every leaf is validated as it is produced, so a
//! bad literal anywhere in the sweep fails before the first run starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BenchError, Result};
use crate::spec::RunSpecification;

/// One sweep-capable field: a single value or a comma-separated list of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Axis(String);

impl Axis {
    pub fn new(raw: impl Into<String>) -> Self {
        Axis(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this axis holds more than one value
    pub fn is_sweep(&self) -> bool {
        self.0.contains(',')
    }

    /// All values on this axis, in the order given, each trimmed of
    /// surrounding whitespace whether or not the axis is a sweep.
    pub fn values(&self) -> Vec<Axis> {
        self.0.split(',').map(|v| Axis(v.trim().to_string())).collect()
    }

    pub fn len(&self) -> usize {
        self.0.split(',').count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parse a single-valued axis. `field` names the option in the error.
    pub fn parse<T>(&self, field: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        if self.is_sweep() {
            return Err(BenchError::config(format!(
                "{} has not been expanded: '{}'",
                field, self.0
            )));
        }
        self.0.trim().parse::<T>().map_err(|e| {
            BenchError::config(format!("invalid {} '{}': {}", field, self.0, e))
        })
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Axis {
    fn from(s: &str) -> Self {
        Axis(s.to_string())
    }
}

impl From<String> for Axis {
    fn from(s: String) -> Self {
        Axis(s)
    }
}

/// Expand a specification into every concrete run it describes.
///
/// Pure: the input is untouched and calling this twice gives equal output.
pub fn expand(spec: &RunSpecification) -> Result<Vec<RunSpecification>> {
    let mut leaves = Vec::with_capacity(sweep_size(spec));

    for runtype in spec.runtype.flatten() {
        for backend in spec.backend.flatten() {
            for protocol in spec.protocol.flatten() {
                for object_size in spec.object_size.values() {
                    for object_count in spec.object_count.values() {
                        for read_write_mix in spec.read_write_mix.values() {
                            let leaf = RunSpecification {
                                runtype: runtype.clone(),
                                backend: backend.clone(),
                                protocol: protocol.clone(),
                                object_size: object_size.clone(),
                                object_count: object_count.clone(),
                                read_write_mix,
                                description: spec.description.clone(),
                            };
                            leaf.validate()?;
                            leaves.push(leaf);
                        }
                    }
                }
            }
        }
    }

    Ok(leaves)
}

/// Number of runs `expand` will produce
pub fn sweep_size(spec: &RunSpecification) -> usize {
    spec.runtype.flatten().len()
        * spec.backend.flatten().len()
        * spec.protocol.flatten().len()
        * spec.object_size.len()
        * spec.object_count.len()
        * spec.read_write_mix.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_is_identity() {
        let axis = Axis::new("4M");
        assert_eq!(axis.values(), vec![axis.clone()]);
        assert!(!axis.is_sweep());
        assert_eq!(axis.len(), 1);
    }

    #[test]
    fn test_single_value_trimmed_like_sweep() {
        assert_eq!(Axis::new(" 4M ").values(), vec![Axis::new("4M")]);
        assert_eq!(Axis::new("1M, 4M").values()[1], Axis::new(" 4M").values()[0]);
    }

    #[test]
    fn test_values_split_and_trim() {
        let axis = Axis::new("1M, 4M ,16M");
        assert_eq!(
            axis.values(),
            vec![Axis::from("1M"), Axis::from("4M"), Axis::from("16M")]
        );
        assert_eq!(axis.len(), 3);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Axis::new("5000").parse::<u64>("object count").unwrap(), 5000);
        assert_eq!(Axis::new("1.5").parse::<f64>("worker factor").unwrap(), 1.5);
        assert!(Axis::new("abc").parse::<u64>("object count").is_err());
    }

    #[test]
    fn test_parse_rejects_unexpanded_sweep() {
        let err = Axis::new("1,2").parse::<u64>("object count").unwrap_err();
        assert!(err.to_string().contains("not been expanded"));
    }
}
