use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = git(&["rev-parse", "--short", "HEAD"]);
    let tree_state = git(&["status", "--porcelain"]).map(|out| {
        if out.is_empty() {
            "clean".to_string()
        } else {
            "dirty".to_string()
        }
    });
    let build_date = Command::new("date")
        .args(["-u", "+%Y-%m-%dT%H:%M:%SZ"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string());
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string());

    emit("HTTP_STAT_GIT_COMMIT", commit);
    emit("HTTP_STAT_GIT_TREE_STATE", tree_state);
    emit("HTTP_STAT_BUILD_DATE", build_date);
    emit("HTTP_STAT_RUSTC_VERSION", rustc_version);
    emit("HTTP_STAT_PLATFORM", std::env::var("TARGET").ok());
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn emit(key: &str, value: Option<String>) {
    let value = value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env={}={}", key, value);
}
