use std::process::Command;

fn main() {
    // Prefer LRC_VERSION if set by a release workflow, else git describe.
    if let Ok(version) = std::env::var("LRC_VERSION") {
        println!("cargo:rustc-env=LRC_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=LRC_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=LRC_VERSION");
}
