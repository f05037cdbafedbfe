use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Error};
use clap::Parser;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::loader::write_output;

#[derive(Parser, Debug, Clone)]
pub struct HashOpt {
    /// The files to hash
    #[clap(required = true)]
    pub files: Vec<PathBuf>,

    /// Where to write the table of the hashes, defaults to stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

/// The hex encoded blake3 hash of the content of a file.
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let path = path.as_ref();
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash the files, indexed by their file name in the order they are given.
pub fn hash_files(files: &[PathBuf]) -> Result<IndexMap<String, String>, Error> {
    let names: Vec<String> = files
        .iter()
        .map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_string())
                .ok_or_else(|| anyhow!("{} is not a file", path.display()))
        })
        .collect::<Result<_, _>>()?;
    if let Some(name) = names.iter().duplicates().next() {
        return Err(anyhow!("More than one file is named '{}'", name));
    }
    names
        .into_iter()
        .zip(files)
        .map(|(name, path)| Ok((name, hash_file(path)?)))
        .collect()
}

pub fn main_hash(opt: HashOpt) -> Result<(), Error> {
    let hashes = hash_files(&opt.files)?;
    let yaml = serde_yaml::to_string(&hashes).context("Failed to serialize the hashes")?;
    write_output(opt.output.as_ref(), &yaml)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_hash_files() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let first = tmpdir.path().join("01.in");
        let second = tmpdir.path().join("01.out");
        std::fs::write(&first, "1 2\n").unwrap();
        std::fs::write(&second, "3\n").unwrap();
        let hashes = hash_files(&[first.clone(), second]).unwrap();
        assert_eq!(hashes.keys().collect::<Vec<_>>(), vec!["01.in", "01.out"]);
        assert_eq!(
            hashes["01.in"],
            blake3::hash(b"1 2\n").to_hex().to_string()
        );
        assert_eq!(hashes["01.in"], hash_file(&first).unwrap());
    }

    #[test]
    fn test_duplicate_names() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmpdir.path().join("a")).unwrap();
        let first = tmpdir.path().join("input.txt");
        let second = tmpdir.path().join("a").join("input.txt");
        std::fs::write(&first, "x").unwrap();
        std::fs::write(&second, "y").unwrap();
        let err = hash_files(&[first, second]).unwrap_err();
        assert!(err.to_string().contains("input.txt"));
    }

    #[test]
    fn test_missing_file() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        assert!(hash_file(tmpdir.path().join("nope")).is_err());
    }
}
