use std::path::Path;
use std::process::Command;

/// The package version, followed by the `git describe` of the tree when available.
fn version() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let described = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty=+dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_default();
    if described.is_empty() {
        version.to_string()
    } else {
        format!("{version} ({described})")
    }
}

fn main() {
    let out_dir = std::env::var("OUT_DIR").expect("missing OUT_DIR");
    std::fs::write(Path::new(&out_dir).join("version.txt"), version())
        .expect("cannot write version.txt");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
