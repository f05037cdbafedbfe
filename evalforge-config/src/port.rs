use crate::{
    join_path, CompilationError, ConfigError, InvariantViolation, Variable, VariableType,
    VariableValue,
};

/// An input or output of a box.
///
/// A port is connected to the other ports of the pipeline through the name of its variable. During
/// the compilation the port receives a concrete value, which can be written only once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// The name of the port, unique among the ports of the same direction of a box.
    pub name: String,
    /// The type of the values this port accepts.
    pub port_type: VariableType,
    variable: String,
    value: Option<Variable>,
    directory: Option<String>,
}

impl Port {
    /// Make a new port not connected to any variable.
    pub fn new<S: Into<String>>(name: S, port_type: VariableType) -> Port {
        Port {
            name: name.into(),
            port_type,
            variable: String::new(),
            value: None,
            directory: None,
        }
    }

    /// Connect the port to the variable with the specified name.
    pub fn with_variable<S: Into<String>>(mut self, variable: S) -> Port {
        self.variable = variable.into();
        self
    }

    /// Connect the port to another variable.
    pub fn connect<S: Into<String>>(&mut self, variable: S) {
        self.variable = variable.into();
    }

    /// The name of the variable connected to this port, `None` if the port is not connected.
    pub fn variable(&self) -> Option<&str> {
        if self.variable.is_empty() {
            None
        } else {
            Some(&self.variable)
        }
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<&Variable> {
        self.value.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// Write the resolved value of the port. Writing again the same value has no effect, writing a
    /// different one is a bug of the compiler.
    pub fn set_value(&mut self, value: Variable) -> Result<(), CompilationError> {
        if value.var_type != self.port_type {
            return Err(ConfigError::TypeMismatch {
                what: format!("port '{}' (variable '{}')", self.name, value.name),
                expected: self.port_type,
                found: value.var_type,
            }
            .into());
        }
        match &self.value {
            Some(current) if current == &value => Ok(()),
            Some(current) => Err(InvariantViolation(format!(
                "port '{}' already holds {:?}, cannot overwrite it with {:?}",
                self.name, current.value, value.value
            ))
            .into()),
            None => {
                self.value = Some(value);
                Ok(())
            }
        }
    }

    /// The directory the files of this port live in, relative to the evaluation directory.
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    pub fn set_directory<S: Into<String>>(&mut self, directory: S) {
        self.directory = Some(directory.into());
    }

    /// The resolved value with the file names prefixed by `base` and by the directory of the port.
    pub fn prefixed_value(&self, base: &str) -> Option<VariableValue> {
        let value = self.value.as_ref()?;
        let prefix = match self.directory.as_deref() {
            Some(dir) if !dir.is_empty() => join_path(base, dir),
            _ => base.to_string(),
        };
        Some(value.prefixed_value(&prefix))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_write_once() {
        let mut port = Port::new("binary-file", VariableType::File).with_variable("binary");
        let value = Variable::new("binary", VariableType::File, "a.out");
        port.set_value(value.clone()).unwrap();
        port.set_value(value).unwrap();
        let err = port
            .set_value(Variable::new("binary", VariableType::File, "b.out"))
            .unwrap_err();
        assert!(!err.is_config());
        assert_eq!(port.value().unwrap().value_as_array(), vec!["a.out"]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut port = Port::new("stdin", VariableType::File);
        let err = port
            .set_value(Variable::new("in", VariableType::String, "x"))
            .unwrap_err();
        assert!(err.is_config());
        assert!(!port.is_resolved());
    }

    #[test]
    fn test_unconnected() {
        let port = Port::new("stdin", VariableType::File).with_variable("");
        assert_eq!(port.variable(), None);
    }

    #[test]
    fn test_prefixed_value() {
        let mut port = Port::new("stdout", VariableType::File);
        assert_eq!(port.prefixed_value("${EVAL_DIR}"), None);
        port.set_value(Variable::new("out", VariableType::File, "out.txt"))
            .unwrap();
        assert_eq!(
            port.prefixed_value("${EVAL_DIR}"),
            Some(VariableValue::from("${EVAL_DIR}/out.txt"))
        );
        port.set_directory("test_01");
        assert_eq!(
            port.prefixed_value("${EVAL_DIR}"),
            Some(VariableValue::from("${EVAL_DIR}/test_01/out.txt"))
        );
    }
}
