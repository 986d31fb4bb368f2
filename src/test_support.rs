use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// A throwaway repository on `main` with one commit containing `README.md`.
pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    // Deterministic default branch across environments.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(path);

    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    // Keep supervisor state out of `git status` in the main checkout.
    std::fs::write(path.join(".gitignore"), ".multiverify/\n").unwrap();
    commit_all(path, "Initial commit");

    temp_dir
}

/// Stage everything in `dir` and commit it.
pub(crate) fn commit_all(dir: &Path, message: &str) {
    configure_identity(dir);
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", message]);
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test User"]);
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }

    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// An agent that runs `script` with `sh -c`.
///
/// With trailing-argument delivery the prompt lands in `$0`.
pub(crate) fn sh_agent(
    name: &str,
    script: &str,
    prompt_via: crate::config::PromptDelivery,
) -> crate::config::AgentSpec {
    use crate::config::template::ArgTemplate;
    crate::config::AgentSpec {
        name: name.to_string(),
        executable: "sh".to_string(),
        args: vec![ArgTemplate::literal("-c"), ArgTemplate::literal(script)],
        prompt_via,
        environment: Default::default(),
        unset_env: Vec::new(),
    }
}
