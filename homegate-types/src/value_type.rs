use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value carried by a property: either a number (scalar) or a label (enum choice).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Label(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Label(s) => s.parse().ok(),
        }
    }

    pub fn as_label(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Label(s) => s.clone(),
        }
    }
}

/// `Scalar{id, name, units, min, max, step, default}` (§3).
///
/// The precondition on `step` resolves an ambiguity in the source material: the rewrite
/// requires `step > 0 ∧ step ≤ (max - min)`, not `step ≤ min_value` as one source path did.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalarType {
    pub id: u32,
    pub name: String,
    pub units: String,
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
    pub default_value: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ValueTypeError {
    #[error("max_value ({max}) is less than min_value ({min})")]
    InvalidRange { min: f64, max: f64 },
    #[error("step ({step}) must satisfy 0 < step <= (max - min) = {span}")]
    InvalidStep { step: f64, span: f64 },
    #[error("default_value ({value}) is outside [{min}, {max}]")]
    InvalidDefault { value: f64, min: f64, max: f64 },
    #[error("default label '{label}' is not one of the enum's choices")]
    UnknownDefaultLabel { label: String },
}

impl ScalarType {
    pub fn new(
        id: u32,
        name: String,
        units: String,
        min_value: f64,
        max_value: f64,
        step: f64,
        default_value: f64,
    ) -> Result<Self, ValueTypeError> {
        if max_value < min_value {
            return Err(ValueTypeError::InvalidRange {
                min: min_value,
                max: max_value,
            });
        }
        let span = max_value - min_value;
        if !(step > 0.0 && step <= span) {
            return Err(ValueTypeError::InvalidStep { step, span });
        }
        if default_value < min_value || default_value > max_value {
            return Err(ValueTypeError::InvalidDefault {
                value: default_value,
                min: min_value,
                max: max_value,
            });
        }
        Ok(Self {
            id,
            name,
            units,
            min_value,
            max_value,
            step,
            default_value,
        })
    }

    /// `min ≤ v ≤ max ∧ (v−min)/step ∈ ℤ` (§3).
    pub fn validate(&self, value: &Value) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        if v < self.min_value || v > self.max_value {
            return false;
        }
        let steps = (v - self.min_value) / self.step;
        (steps - steps.round()).abs() < 1e-9
    }

    pub fn default(&self) -> Value {
        Value::Number(self.default_value)
    }
}

/// `Enum{id, name, choices: mapping label→value, default label}` (§3).
///
/// Enum defaults are stored and serialized by **label**, never by the numeric choice
/// value — one of the open questions §9 asks the rewrite to settle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnumType {
    pub id: u32,
    pub name: String,
    pub choices: BTreeMap<String, serde_json::Value>,
    pub default_value: String,
}

impl EnumType {
    pub fn new(
        id: u32,
        name: String,
        choices: BTreeMap<String, serde_json::Value>,
        default_value: String,
    ) -> Result<Self, ValueTypeError> {
        if !choices.contains_key(&default_value) {
            return Err(ValueTypeError::UnknownDefaultLabel {
                label: default_value,
            });
        }
        Ok(Self {
            id,
            name,
            choices,
            default_value,
        })
    }

    /// `v ∈ choices.labels` (§3).
    pub fn validate(&self, value: &Value) -> bool {
        self.choices.contains_key(&value.as_label())
    }

    pub fn default(&self) -> Value {
        Value::Label(self.default_value.clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum ValueType {
    Scalar(ScalarType),
    Enum(EnumType),
}

impl ValueType {
    pub fn id(&self) -> u32 {
        match self {
            ValueType::Scalar(s) => s.id,
            ValueType::Enum(e) => e.id,
        }
    }

    pub fn validate(&self, value: &Value) -> bool {
        match self {
            ValueType::Scalar(s) => s.validate(value),
            ValueType::Enum(e) => e.validate(value),
        }
    }

    pub fn default(&self) -> Value {
        match self {
            ValueType::Scalar(s) => s.default(),
            ValueType::Enum(e) => e.default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_boundary_values_validate() {
        let t = ScalarType::new(1, "temp".into(), "C".into(), 0.0, 100.0, 5.0, 20.0).unwrap();
        assert!(t.validate(&Value::Number(0.0)));
        assert!(t.validate(&Value::Number(100.0)));
        assert!(!t.validate(&Value::Number(100.1)));
        assert!(!t.validate(&Value::Number(2.0)));
    }

    #[test]
    fn scalar_rejects_invalid_step() {
        assert!(ScalarType::new(1, "x".into(), "".into(), 0.0, 10.0, 0.0, 0.0).is_err());
        assert!(ScalarType::new(1, "x".into(), "".into(), 0.0, 10.0, 11.0, 0.0).is_err());
    }

    #[test]
    fn enum_rejects_label_outside_choices() {
        let mut choices = BTreeMap::new();
        choices.insert("on".to_string(), serde_json::json!(1));
        choices.insert("off".to_string(), serde_json::json!(0));
        let t = EnumType::new(1, "power".into(), choices, "off".into()).unwrap();
        assert!(t.validate(&Value::Label("on".into())));
        assert!(!t.validate(&Value::Label("blink".into())));
    }

    #[test]
    fn enum_default_must_be_a_known_label() {
        let mut choices = BTreeMap::new();
        choices.insert("on".to_string(), serde_json::json!(1));
        assert!(EnumType::new(1, "power".into(), choices, "off".into()).is_err());
    }
}
