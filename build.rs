// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=AICAM_VERSION");

    // Packagers may pin the version
    let version = match std::env::var("AICAM_VERSION") {
        Ok(v) => v,
        Err(_) => git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "0.1.0-abcdef1" at a tag, "0.1.0-dirty-abcdef1" past it
fn git_version() -> Option<String> {
    let described = git(&["describe", "--tags", "--always", "--match", "v*"])?;
    let described = described.strip_prefix('v').unwrap_or(&described);

    if described.contains('-') {
        let parts: Vec<&str> = described.rsplitn(3, '-').collect();
        if parts.len() >= 3 {
            let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
            return Some(format!("{}-dirty-{}", parts[2], hash));
        }
        return Some(described.to_string());
    }

    let hash = git(&["rev-parse", "--short", "HEAD"])?;
    if hash == described {
        // No tag yet
        return Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), hash));
    }
    Some(format!("{}-{}", described, hash))
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
