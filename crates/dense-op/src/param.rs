// FullyConnectedParam — typed configuration of a fully connected layer
//
// Graph builders configure layers through string name/value pairs (the
// `set_param` entry point of a symbol). Those strings are parsed and
// validated here, once, into a plain Copy struct; from then on every symbol
// and operator holds its own copy and never sees a string again.
//
// RECOGNIZED OPTIONS:
//
//   num_hidden   positive integer, number of output units
//   no_bias      boolean-like (0/1/true/false), drop the bias term

use std::fmt;

use dense_core::{Error, Result};

/// Configuration of a fully connected layer.
///
/// `num_hidden == 0` means "not configured yet"; shape inference and bind
/// both reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullyConnectedParam {
    num_hidden: usize,
    no_bias: bool,
}

impl FullyConnectedParam {
    /// Validated constructor.
    pub fn new(num_hidden: usize, no_bias: bool) -> Result<Self> {
        if num_hidden == 0 {
            return Err(invalid("num_hidden", "0", "must be a positive integer"));
        }
        Ok(FullyConnectedParam {
            num_hidden,
            no_bias,
        })
    }

    /// Build from a list of name/value pairs applied in order.
    ///
    /// Either every pair applies or the call fails and nothing is built.
    pub fn from_kwargs<'a, I>(kwargs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut param = FullyConnectedParam::default();
        for (name, value) in kwargs {
            param.set_param(name, value)?;
        }
        Ok(param)
    }

    /// Apply one option by name. On error `self` is unchanged.
    pub fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "num_hidden" => self.num_hidden = parse_num_hidden(value)?,
            "no_bias" => self.no_bias = parse_bool(name, value)?,
            _ => {
                return Err(Error::UnknownParam {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn num_hidden(&self) -> usize {
        self.num_hidden
    }

    pub fn no_bias(&self) -> bool {
        self.no_bias
    }

    pub fn has_bias(&self) -> bool {
        !self.no_bias
    }

    /// Number of inputs the layer takes: `[data, weight]` or `[data, weight, bias]`.
    pub fn num_inputs(&self) -> usize {
        if self.no_bias {
            2
        } else {
            3
        }
    }
}

impl fmt::Display for FullyConnectedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "num_hidden={}, no_bias={}", self.num_hidden, self.no_bias)
    }
}

fn invalid(name: &str, value: &str, reason: impl Into<String>) -> Error {
    Error::InvalidParam {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_num_hidden(value: &str) -> Result<usize> {
    let n = value
        .trim()
        .parse::<usize>()
        .map_err(|e| invalid("num_hidden", value, e.to_string()))?;
    if n == 0 {
        return Err(invalid("num_hidden", value, "must be a positive integer"));
    }
    Ok(n)
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "false" | "False" | "FALSE" => Ok(false),
        _ => Err(invalid(name, value, "expected one of 0, 1, true, false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconfigured() {
        let p = FullyConnectedParam::default();
        assert_eq!(p.num_hidden(), 0);
        assert!(p.has_bias());
        assert_eq!(p.num_inputs(), 3);
    }

    #[test]
    fn test_new_rejects_zero_hidden() {
        assert!(matches!(
            FullyConnectedParam::new(0, false),
            Err(Error::InvalidParam { .. })
        ));
        let p = FullyConnectedParam::new(4, true).unwrap();
        assert_eq!(p.num_inputs(), 2);
    }

    #[test]
    fn test_set_param_parses_values() {
        let mut p = FullyConnectedParam::default();
        p.set_param("num_hidden", " 128 ").unwrap();
        p.set_param("no_bias", "True").unwrap();
        assert_eq!(p.num_hidden(), 128);
        assert!(p.no_bias());
        p.set_param("no_bias", "0").unwrap();
        assert!(!p.no_bias());
    }

    #[test]
    fn test_set_param_rejects_bad_values_without_change() {
        let mut p = FullyConnectedParam::new(8, false).unwrap();
        for (name, value) in [
            ("num_hidden", "-3"),
            ("num_hidden", "0"),
            ("num_hidden", "four"),
            ("no_bias", "maybe"),
        ] {
            let err = p.set_param(name, value).unwrap_err();
            assert!(matches!(err, Error::InvalidParam { .. }), "{name}={value}");
        }
        assert_eq!(p, FullyConnectedParam::new(8, false).unwrap());
    }

    #[test]
    fn test_set_param_unknown_name() {
        let mut p = FullyConnectedParam::default();
        let err = p.set_param("kernel", "3").unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter `kernel`");
    }

    #[test]
    fn test_from_kwargs() {
        let p = FullyConnectedParam::from_kwargs([("num_hidden", "4"), ("no_bias", "1")]).unwrap();
        assert_eq!(p, FullyConnectedParam::new(4, true).unwrap());
        assert!(FullyConnectedParam::from_kwargs([("num_hidden", "4"), ("stride", "1")]).is_err());
    }

    #[test]
    fn test_display() {
        let p = FullyConnectedParam::new(4, false).unwrap();
        assert_eq!(p.to_string(), "num_hidden=4, no_bias=false");
    }
}
