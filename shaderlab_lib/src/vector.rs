//! Vector and color material property values.
use std::collections::BTreeMap;

use serde::{ser::SerializeMap, Serialize, Serializer};

/// Text rendering with a fixed number of decimal places like `(1.00000, 0.50000)`.
pub trait FixedPrecision {
    fn fixed_text(&self) -> String;
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Vector {
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Vector(Vector),
    Color(Color),
}

impl PropertyValue {
    /// Create a value from named components like `{"x": 1.0, "y": 2.0}`.
    /// Returns `None` if the components don't form a vector or color.
    pub fn from_components(components: &BTreeMap<String, f32>) -> Option<Self> {
        let get = |name: &str| components.get(name).copied();
        let has_all = |names: &[&str]| {
            components.len() == names.len() && names.iter().all(|n| components.contains_key(*n))
        };

        if has_all(&["r", "g", "b", "a"]) {
            Some(Self::Color(Color {
                r: get("r")?,
                g: get("g")?,
                b: get("b")?,
                a: get("a")?,
            }))
        } else if has_all(&["x", "y", "z", "w"]) {
            Some(Self::Vector(Vector::Vec4([
                get("x")?,
                get("y")?,
                get("z")?,
                get("w")?,
            ])))
        } else if has_all(&["x", "y", "z"]) {
            Some(Self::Vector(Vector::Vec3([get("x")?, get("y")?, get("z")?])))
        } else if has_all(&["x", "y"]) {
            Some(Self::Vector(Vector::Vec2([get("x")?, get("y")?])))
        } else {
            None
        }
    }
}

impl Vector {
    pub fn components(&self) -> &[f32] {
        match self {
            Vector::Vec2(v) => v,
            Vector::Vec3(v) => v,
            Vector::Vec4(v) => v,
        }
    }
}

impl FixedPrecision for Vector {
    fn fixed_text(&self) -> String {
        fixed_text(self.components())
    }
}

impl FixedPrecision for Color {
    fn fixed_text(&self) -> String {
        fixed_text(&[self.r, self.g, self.b, self.a])
    }
}

impl FixedPrecision for PropertyValue {
    fn fixed_text(&self) -> String {
        match self {
            PropertyValue::Vector(v) => v.fixed_text(),
            PropertyValue::Color(c) => c.fixed_text(),
        }
    }
}

fn fixed_text(values: &[f32]) -> String {
    let values: Vec<_> = values.iter().map(|v| format!("{v:.5}")).collect();
    format!("({})", values.join(", "))
}

fn round5(value: f32) -> f64 {
    // Round using the decimal text to match the fixed precision output.
    let value = value as f64;
    format!("{value:.5}").parse().unwrap_or(value)
}

impl Serialize for Vector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = ["x", "y", "z", "w"];
        let components = self.components();
        let mut map = serializer.serialize_map(Some(components.len()))?;
        for (name, value) in names.iter().zip(components) {
            match self {
                // Only larger vectors are rounded.
                Vector::Vec2(_) => map.serialize_entry(name, value)?,
                Vector::Vec3(_) | Vector::Vec4(_) => map.serialize_entry(name, &round5(*value))?,
            }
        }
        map.end()
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("r", &self.r)?;
        map.serialize_entry("g", &self.g)?;
        map.serialize_entry("b", &self.b)?;
        map.serialize_entry("a", &self.a)?;
        map.end()
    }
}
