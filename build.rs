use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let mut long_version = version.clone();

    if let Ok(output) = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output()
        && output.status.success()
    {
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !sha.is_empty() {
            println!("cargo:rustc-env=TM2BD_BUILD_GIT_SHA={sha}");
            long_version = format!("{version} ({sha})");
        }
    }

    println!("cargo:rustc-env=TM2BD_LONG_VERSION={long_version}");
}
