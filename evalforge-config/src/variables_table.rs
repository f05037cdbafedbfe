use std::convert::TryFrom;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Variable};

/// An ordered collection of variables, indexed by name.
///
/// In the configuration files a table is written as a list of `{name, type, value}` entries. A
/// name repeated in the list makes the whole table invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Variable>", into = "Vec<Variable>")]
pub struct VariablesTable {
    table: IndexMap<String, Variable>,
}

impl VariablesTable {
    pub fn new() -> VariablesTable {
        VariablesTable::default()
    }

    /// Build a table from a list of variables, checking each of them and the uniqueness of the
    /// names.
    pub fn from_variables<I: IntoIterator<Item = Variable>>(
        variables: I,
    ) -> Result<VariablesTable, ConfigError> {
        let mut table = VariablesTable::new();
        for var in variables {
            var.validate()?;
            if table.contains(&var.name) {
                return Err(ConfigError::Duplicate {
                    what: "variable",
                    name: var.name,
                });
            }
            table.set(var);
        }
        Ok(table)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// The variable with the specified name. An empty variable is present, a missing one is not.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.table.get(name)
    }

    /// Insert a variable, replacing the one with the same name keeping its position.
    pub fn set(&mut self, variable: Variable) -> &mut Self {
        self.table.insert(variable.name.clone(), variable);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.table.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.table.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl TryFrom<Vec<Variable>> for VariablesTable {
    type Error = ConfigError;

    fn try_from(value: Vec<Variable>) -> Result<Self, Self::Error> {
        VariablesTable::from_variables(value)
    }
}

impl From<VariablesTable> for Vec<Variable> {
    fn from(table: VariablesTable) -> Self {
        table.table.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::VariableType;

    #[test]
    fn test_set_replaces_in_place() {
        let mut table = VariablesTable::new();
        table
            .set(Variable::new("a", VariableType::String, "1"))
            .set(Variable::new("b", VariableType::String, "2"))
            .set(Variable::new("a", VariableType::String, "3"));
        let names: Vec<_> = table.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.get("a").unwrap().value_as_array(), vec!["3"]);
    }

    #[test]
    fn test_deserialize_duplicate() {
        let yaml = "- {name: a, type: string, value: x}\n- {name: a, type: string, value: y}";
        let err = serde_yaml::from_str::<VariablesTable>(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate variable 'a'"));
    }

    #[test]
    fn test_deserialize_invalid_variable() {
        let yaml = "- {name: a, type: string, value: [x, y]}";
        assert!(serde_yaml::from_str::<VariablesTable>(yaml).is_err());
    }

    #[test]
    fn test_serialize_as_list() {
        let table = VariablesTable::from_variables(vec![Variable::new(
            "files",
            VariableType::FileArray,
            vec!["a.c"],
        )])
        .unwrap();
        let yaml = serde_yaml::to_string(&table).unwrap();
        let back: VariablesTable = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, table);
        assert!(yaml.starts_with("- name: files"));
    }
}
