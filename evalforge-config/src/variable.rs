use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Prefix marking a variable value as a reference to another variable.
pub const REFERENCE_PREFIX: char = '$';

/// The type of a [`Variable`](struct.Variable.html) or of a [`Port`](struct.Port.html).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file[]")]
    FileArray,
    #[serde(rename = "remote-file")]
    RemoteFile,
    #[serde(rename = "remote-file[]")]
    RemoteFileArray,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::StringArray => "string[]",
            VariableType::File => "file",
            VariableType::FileArray => "file[]",
            VariableType::RemoteFile => "remote-file",
            VariableType::RemoteFileArray => "remote-file[]",
        }
    }

    /// Whether values of this type are arrays.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            VariableType::StringArray | VariableType::FileArray | VariableType::RemoteFileArray
        )
    }

    /// Whether values of this type are names of local files.
    pub fn is_file(&self) -> bool {
        matches!(self, VariableType::File | VariableType::FileArray)
    }

    /// Whether values of this type are remote files, identified by name and fetched by hash.
    pub fn is_remote_file(&self) -> bool {
        matches!(self, VariableType::RemoteFile | VariableType::RemoteFileArray)
    }
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of a variable: a single string or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(String),
    Array(Vec<String>),
}

impl VariableValue {
    /// Whether the value is the empty string or the empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            VariableValue::Scalar(s) => s.is_empty(),
            VariableValue::Array(a) => a.is_empty(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, VariableValue::Array(_))
    }

    /// The value as a list: a scalar becomes a list with a single element.
    pub fn as_array(&self) -> Vec<String> {
        match self {
            VariableValue::Scalar(s) => vec![s.clone()],
            VariableValue::Array(a) => a.clone(),
        }
    }

    /// Apply a function to every string of the value, keeping its shape.
    pub fn map<F: FnMut(&str) -> String>(&self, mut f: F) -> VariableValue {
        match self {
            VariableValue::Scalar(s) => VariableValue::Scalar(f(s)),
            VariableValue::Array(a) => VariableValue::Array(a.iter().map(|s| f(s)).collect()),
        }
    }
}

impl Default for VariableValue {
    fn default() -> Self {
        VariableValue::Scalar(String::new())
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Scalar(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Scalar(value)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(value: Vec<String>) -> Self {
        VariableValue::Array(value)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(value: Vec<&str>) -> Self {
        VariableValue::Array(value.into_iter().map(String::from).collect())
    }
}

/// A named and typed value.
///
/// A variable whose value is a string starting with `$` is a reference: its actual value is the
/// one of the variable with the referenced name, looked up in the environment and exercise tables.
/// A scalar value of a `file[]` variable is a wildcard pattern matched against the submitted files.
///
/// ```
/// use evalforge_config::{Variable, VariableType};
///
/// let var = Variable::new("source_files", VariableType::FileArray, "$sources");
/// assert_eq!(var.reference(), Some("sources"));
///
/// let var = Variable::new("binary", VariableType::File, "a.out");
/// assert_eq!(var.prefixed_value("${EVAL_DIR}/01").as_array(), vec!["${EVAL_DIR}/01/a.out"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// The name of the variable.
    pub name: String,
    /// The type of the variable.
    #[serde(rename = "type")]
    pub var_type: VariableType,
    /// The actual value.
    #[serde(default)]
    pub value: VariableValue,
}

impl Variable {
    /// Make a new variable. The value is not checked against the type, see
    /// [`validate`](#method.validate).
    pub fn new<S: Into<String>, V: Into<VariableValue>>(
        name: S,
        var_type: VariableType,
        value: V,
    ) -> Variable {
        Variable {
            name: name.into(),
            var_type,
            value: value.into(),
        }
    }

    /// Check that the value has the cardinality of the type. References and wildcard patterns of
    /// `file[]` variables are scalars even if the type is an array.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidVariable {
                name: self.name.clone(),
                reason: "the name cannot be empty".into(),
            });
        }
        if self.is_reference() {
            if self.reference().map_or(true, str::is_empty) {
                return Err(ConfigError::InvalidVariable {
                    name: self.name.clone(),
                    reason: "the reference is empty".into(),
                });
            }
            return Ok(());
        }
        match (&self.value, self.var_type.is_array()) {
            (VariableValue::Array(_), false) => Err(ConfigError::InvalidVariable {
                name: self.name.clone(),
                reason: format!("a {} cannot hold a list", self.var_type),
            }),
            (VariableValue::Scalar(s), true)
                if self.var_type != VariableType::FileArray && !s.is_empty() =>
            {
                Err(ConfigError::InvalidVariable {
                    name: self.name.clone(),
                    reason: format!("a {} must hold a list", self.var_type),
                })
            }
            _ => Ok(()),
        }
    }

    /// Whether the value refers to another variable.
    pub fn is_reference(&self) -> bool {
        matches!(&self.value, VariableValue::Scalar(s) if s.starts_with(REFERENCE_PREFIX))
    }

    /// The name of the referenced variable, if this is a reference.
    pub fn reference(&self) -> Option<&str> {
        match &self.value {
            VariableValue::Scalar(s) => s.strip_prefix(REFERENCE_PREFIX),
            VariableValue::Array(_) => None,
        }
    }

    /// Whether the value is a pattern to match against the submitted files.
    pub fn is_wildcard(&self) -> bool {
        self.var_type.is_file() && !self.value.is_array() && !self.is_reference()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_file(&self) -> bool {
        self.var_type.is_file()
    }

    pub fn is_remote_file(&self) -> bool {
        self.var_type.is_remote_file()
    }

    pub fn is_array(&self) -> bool {
        self.var_type.is_array()
    }

    /// The value as a list of strings.
    pub fn value_as_array(&self) -> Vec<String> {
        self.value.as_array()
    }

    /// The value with every file name prefixed by the specified directory. The values of non-file
    /// variables and empty names are left untouched.
    pub fn prefixed_value(&self, prefix: &str) -> VariableValue {
        if !self.is_file() {
            return self.value.clone();
        }
        self.value.map(|name| join_path(prefix, name))
    }

    /// The same variable with another name.
    pub fn renamed<S: Into<String>>(&self, name: S) -> Variable {
        Variable {
            name: name.into(),
            var_type: self.var_type,
            value: self.value.clone(),
        }
    }
}

/// Join a directory and a file name with a single `/`, skipping empty components.
pub fn join_path(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_reference() {
        let var = Variable::new("a", VariableType::String, "$b");
        assert!(var.is_reference());
        assert_eq!(var.reference(), Some("b"));
        let var = Variable::new("a", VariableType::String, "b");
        assert!(!var.is_reference());
        assert_eq!(var.reference(), None);
        let var = Variable::new("a", VariableType::StringArray, vec!["$b"]);
        assert!(!var.is_reference());
    }

    #[test]
    fn test_validate_cardinality() {
        assert!(Variable::new("a", VariableType::String, "x").validate().is_ok());
        assert!(Variable::new("a", VariableType::String, vec!["x"])
            .validate()
            .is_err());
        assert!(Variable::new("a", VariableType::StringArray, "x")
            .validate()
            .is_err());
        assert!(Variable::new("a", VariableType::StringArray, "$x")
            .validate()
            .is_ok());
        assert!(Variable::new("a", VariableType::FileArray, "*.c")
            .validate()
            .is_ok());
        assert!(Variable::new("a", VariableType::String, "$").validate().is_err());
        assert!(Variable::new("", VariableType::String, "").validate().is_err());
    }

    #[test]
    fn test_empty_is_not_missing() {
        let var = Variable::new("a", VariableType::FileArray, Vec::<String>::new());
        assert!(var.is_empty());
        assert!(var.validate().is_ok());
    }

    #[test]
    fn test_prefixed_value() {
        let var = Variable::new("a", VariableType::FileArray, vec!["x.c", "y.c"]);
        assert_eq!(
            var.prefixed_value("dir/"),
            VariableValue::from(vec!["dir/x.c", "dir/y.c"])
        );
        let var = Variable::new("a", VariableType::String, "x.c");
        assert_eq!(var.prefixed_value("dir"), VariableValue::from("x.c"));
        let var = Variable::new("a", VariableType::RemoteFile, "hash");
        assert_eq!(var.prefixed_value("dir"), VariableValue::from("hash"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("x/", "/a"), "x/a");
        assert_eq!(join_path("x", ""), "");
    }

    #[test]
    fn test_deserialize() {
        let var: Variable =
            serde_yaml::from_str("name: files\ntype: file[]\nvalue: [a.c, b.c]").unwrap();
        assert_eq!(var.var_type, VariableType::FileArray);
        assert_eq!(var.value_as_array(), vec!["a.c", "b.c"]);
        let var: Variable = serde_yaml::from_str("name: ref\ntype: string\nvalue: $x").unwrap();
        assert_eq!(var.reference(), Some("x"));
    }
}
