use std::collections::HashSet;

use indexmap::IndexMap;

use evalforge_config::BoxKind;

use crate::OptimizedNode;

/// The working directories of an exercise, relative to the evaluation directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestDirectories {
    /// The directory of every test, in test order.
    pub tests: IndexMap<String, String>,
    /// The directories of the shared boxes whose files would clash with other shared files.
    pub shared: Vec<String>,
}

impl TestDirectories {
    /// All the directories to create, tests first.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.tests
            .values()
            .chain(self.shared.iter())
            .map(String::as_str)
    }
}

/// Places every box in a working directory.
///
/// Every test gets its own directory, derived from its identifier. The boxes used by a single test
/// work in the directory of the test, while the boxes shared between tests (and the submitted
/// files) stay in the root directory. The output ports live in the directory of their box, the
/// input ports in the one of the box producing them.
pub struct TestDirectoriesResolver;

impl TestDirectoriesResolver {
    pub fn resolve(tests: &[String], nodes: &mut [OptimizedNode]) -> TestDirectories {
        let mut used: HashSet<String> = HashSet::new();
        let mut directories = TestDirectories::default();
        for test in tests {
            let dir = unique(&sanitize(test), &mut used);
            directories.tests.insert(test.clone(), dir);
        }

        let mut root_files: HashSet<String> = HashSet::new();
        for node in nodes.iter_mut() {
            let owner = match node.tests.as_slice() {
                [test] if node.pipeline_box.kind != BoxKind::DataIn => Some(test.clone()),
                _ => None,
            };
            let owner = owner.and_then(|test| {
                let dir = directories.tests.get(&test).cloned();
                dir.map(|dir| (test, dir))
            });
            match owner {
                Some((test, dir)) => {
                    node.directory = dir;
                    node.test_id = Some(test);
                }
                None => {
                    let files = output_files(node);
                    if files.iter().any(|f| root_files.contains(f)) {
                        let dir = unique("shared", &mut used);
                        directories.shared.push(dir.clone());
                        node.directory = dir;
                    } else {
                        root_files.extend(files);
                        node.directory = String::new();
                    }
                    node.test_id = None;
                }
            }
        }

        for index in 0..nodes.len() {
            let own = nodes[index].directory.clone();
            let inputs: Vec<(String, String)> = nodes[index]
                .pipeline_box
                .input_ports()
                .map(|p| {
                    let dir = match nodes[index].parents.get(&p.name) {
                        Some(parent) => nodes[parent.node].directory.clone(),
                        None => own.clone(),
                    };
                    (p.name.clone(), dir)
                })
                .collect();
            let node = &mut nodes[index];
            for (port, dir) in inputs {
                if let Some(port) = node.pipeline_box.input_port_mut(&port) {
                    port.set_directory(dir);
                }
            }
            for port in node.pipeline_box.output_ports_mut() {
                port.set_directory(own.clone());
            }
        }
        directories
    }
}

/// The directory name of a test: the characters other than letters, digits, `-` and `_` are
/// replaced by `_`.
pub fn sanitize(test: &str) -> String {
    let dir: String = test
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if dir.is_empty() {
        "_".to_string()
    } else {
        dir
    }
}

/// The first of `base`, `base_1`, `base_2`, ... not used yet, which becomes used.
fn unique(base: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut suffix = 1;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// The names of the local files written by a box.
fn output_files(node: &OptimizedNode) -> Vec<String> {
    node.pipeline_box
        .output_ports()
        .filter_map(|p| p.value())
        .filter(|v| v.is_file())
        .flat_map(|v| v.value_as_array())
        .filter(|f| !f.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use evalforge_config::{ports, PipelineBox, Variable, VariableType};

    use super::*;
    use crate::PortRef;

    fn node(kind: BoxKind, tests: &[&str]) -> OptimizedNode {
        OptimizedNode {
            pipeline_box: PipelineBox::new("box", kind),
            pipeline: "p".into(),
            tests: tests.iter().map(|t| t.to_string()).collect(),
            parents: IndexMap::new(),
            directory: String::new(),
            test_id: None,
        }
    }

    fn fetch(tests: &[&str], file: &str) -> OptimizedNode {
        let mut node = node(BoxKind::FetchFile, tests);
        node.pipeline_box
            .output_port_mut(ports::INPUT)
            .unwrap()
            .set_value(Variable::new("f", VariableType::File, file))
            .unwrap();
        node
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Test 01"), "Test_01");
        assert_eq!(sanitize("a/b.c"), "a_b_c");
        assert_eq!(sanitize("ok-name_1"), "ok-name_1");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn test_collisions() {
        let tests = vec!["a b".to_string(), "a_b".to_string(), "a.b".to_string()];
        let dirs = TestDirectoriesResolver::resolve(&tests, &mut []);
        assert_eq!(
            dirs.tests.values().collect::<Vec<_>>(),
            vec!["a_b", "a_b_1", "a_b_2"]
        );
    }

    #[test]
    fn test_owned_and_shared() {
        let tests = vec!["01".to_string(), "02".to_string()];
        let mut nodes = vec![
            node(BoxKind::DataIn, &["01"]),
            node(BoxKind::GccCompilation, &["01", "02"]),
            node(BoxKind::ElfExecution, &["02"]),
        ];
        nodes[2].parents.insert(
            ports::BINARY_FILE.into(),
            PortRef {
                node: 1,
                port: ports::BINARY_FILE.into(),
            },
        );
        TestDirectoriesResolver::resolve(&tests, &mut nodes);
        assert_eq!(nodes[0].directory, "");
        assert_eq!(nodes[0].test_id, None);
        assert_eq!(nodes[1].directory, "");
        assert_eq!(nodes[2].directory, "02");
        assert_eq!(nodes[2].test_id.as_deref(), Some("02"));
        let exec = &nodes[2].pipeline_box;
        assert_eq!(exec.input_port(ports::BINARY_FILE).unwrap().directory(), Some(""));
        assert_eq!(exec.input_port(ports::STDIN).unwrap().directory(), Some("02"));
        assert_eq!(exec.output_port(ports::STDOUT).unwrap().directory(), Some("02"));
    }

    #[test]
    fn test_shared_files_clash() {
        let tests = vec!["01".to_string(), "02".to_string(), "03".to_string()];
        let mut nodes = vec![
            fetch(&["01", "02"], "data.txt"),
            fetch(&["02", "03"], "data.txt"),
            fetch(&["01", "03"], "other.txt"),
        ];
        let dirs = TestDirectoriesResolver::resolve(&tests, &mut nodes);
        assert_eq!(nodes[0].directory, "");
        assert_eq!(nodes[1].directory, "shared");
        assert_eq!(nodes[2].directory, "");
        assert_eq!(dirs.all().collect::<Vec<_>>(), vec!["01", "02", "03", "shared"]);
    }
}
