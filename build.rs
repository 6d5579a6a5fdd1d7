use std::process::Command;

fn main() {
    // Packagers building outside a git checkout can pin the commit themselves
    println!("cargo:rerun-if-env-changed=BUILD_COMMIT");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = std::env::var("BUILD_COMMIT")
        .ok()
        .filter(|c| !c.trim().is_empty())
        .or_else(git_short_commit)
        .unwrap_or_else(|| "unknown".to_string());

    // Read back by `--version` and the wasm `get_build_commit` export
    println!("cargo:rustc-env=BUILD_COMMIT={}", commit.trim());
}

/// First 8 characters of HEAD, if git is available
fn git_short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
