//! Dataset attribute schema, feature vectors, and labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the nominal class attribute appended after all feature attributes.
pub const CLASS_ATTRIBUTE: &str = "isFixed";

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// A real number.
    Numeric,
    /// One of a fixed set of values.
    Nominal(Vec<String>),
}

/// One named column of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Column name.
    pub name: String,
    /// Column type.
    pub kind: AttributeType,
}

/// Ordered attribute list shared by every row of a dataset.
///
/// # Examples
///
/// ```
/// use fixpulse_dataset::schema::Schema;
///
/// let mut schema = Schema::new();
/// schema.add_numeric("numCommits").add_numeric("numAuthors");
/// schema.set_class("isFixed", &["true", "false"]);
///
/// assert_eq!(schema.len(), 3);
/// assert_eq!(schema.feature_names().collect::<Vec<_>>(), vec!["numCommits", "numAuthors"]);
/// assert_eq!(schema.class().unwrap().name, "isFixed");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
    class: Option<Attribute>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a numeric feature attribute. Registering a name twice is a no-op.
    pub fn add_numeric(&mut self, name: &str) -> &mut Self {
        if !self.contains(name) {
            self.attributes.push(Attribute {
                name: name.to_string(),
                kind: AttributeType::Numeric,
            });
        }
        self
    }

    /// Set the nominal class attribute, which is always the last column.
    pub fn set_class(&mut self, name: &str, values: &[&str]) -> &mut Self {
        self.class = Some(Attribute {
            name: name.to_string(),
            kind: AttributeType::Nominal(values.iter().map(|v| v.to_string()).collect()),
        });
        self
    }

    /// Whether a feature attribute called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Feature attributes in column order.
    pub fn features(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Feature attribute names in column order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// The class attribute, if set.
    pub fn class(&self) -> Option<&Attribute> {
        self.class.as_ref()
    }

    /// All attributes, class last.
    pub fn columns(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().chain(self.class.iter())
    }

    /// Total number of columns including the class.
    pub fn len(&self) -> usize {
        self.attributes.len() + usize::from(self.class.is_some())
    }

    /// `true` when no attribute is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binary dataset target: whether the chunk a row came from ends in a fix.
///
/// # Examples
///
/// ```
/// use fixpulse_dataset::schema::Label;
///
/// assert_eq!(Label::Fixed.as_str(), "true");
/// assert_eq!(Label::from(false), Label::Unfixed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// The chunk is terminated by a fix commit.
    Fixed,
    /// The chunk runs to the end of history without a fix.
    Unfixed,
}

impl Label {
    /// Nominal value written to the class column.
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Fixed => "true",
            Label::Unfixed => "false",
        }
    }

    /// Nominal values of the class attribute.
    pub fn values() -> [&'static str; 2] {
        [Label::Fixed.as_str(), Label::Unfixed.as_str()]
    }
}

impl From<bool> for Label {
    fn from(is_fixed: bool) -> Self {
        if is_fixed {
            Label::Fixed
        } else {
            Label::Unfixed
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted row: attribute values for one prefix of one chunk.
///
/// # Examples
///
/// ```
/// use fixpulse_dataset::schema::FeatureVector;
///
/// let mut v = FeatureVector::new("src/A.java", 0);
/// v.set("numCommits", 1.0).set("avgChanges", 2.5);
/// assert_eq!(v.get("avgChanges"), Some(2.5));
/// assert_eq!(v.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Entity the chunk belongs to.
    pub entity: String,
    /// Chunk index within the entity.
    pub chunk: usize,
    values: Vec<(String, f64)>,
}

impl FeatureVector {
    /// Create an empty vector for a chunk.
    pub fn new(entity: &str, chunk: usize) -> Self {
        Self {
            entity: entity.to_string(),
            chunk,
            values: Vec::new(),
        }
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn set(&mut self, name: &str, value: f64) -> &mut Self {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
        self
    }

    /// Value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// `(name, value)` pairs in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// First attribute whose value is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut schema = Schema::new();
        schema.add_numeric("a").add_numeric("b").add_numeric("a");
        assert_eq!(schema.feature_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn class_is_last_column() {
        let mut schema = Schema::new();
        schema.set_class(CLASS_ATTRIBUTE, &Label::values());
        schema.add_numeric("x");
        let names: Vec<&str> = schema.columns().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["x", CLASS_ATTRIBUTE]);
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn empty_schema() {
        let schema = Schema::new();
        assert!(schema.is_empty());
        assert!(schema.class().is_none());
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut v = FeatureVector::new("A", 0);
        v.set("x", 1.0).set("x", 2.0);
        assert_eq!(v.values().count(), 1);
        assert_eq!(v.get("x"), Some(2.0));
    }

    #[test]
    fn non_finite_values_are_found() {
        let mut v = FeatureVector::new("A", 0);
        v.set("ok", 1.0).set("bad", f64::NAN);
        assert_eq!(v.first_non_finite(), Some("bad"));
        v.set("bad", 0.0);
        assert_eq!(v.first_non_finite(), None);
    }

    #[test]
    fn label_conversions() {
        assert_eq!(Label::from(true), Label::Fixed);
        assert_eq!(Label::Unfixed.to_string(), "false");
        assert_eq!(Label::values(), ["true", "false"]);
    }
}
