use super::*;
use crate::config::template::{ArgTemplate, Placeholder};
use crate::test_support::sh_agent;
use std::time::Duration;
use tempfile::TempDir;

fn vars<'a>(workspace: &'a Path, log_file: &'a Path) -> ArgVars<'a> {
    ArgVars {
        workspace,
        log_file,
    }
}

fn env_pairs(pairs: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
    pairs
        .iter()
        .map(|(k, v)| (OsString::from(k), OsString::from(v)))
        .collect()
}

fn process_launcher() -> Launcher {
    let path = std::env::var_os("PATH").unwrap_or_default();
    Launcher::with_env(vec![
        (OsString::from("PATH"), path),
        (OsString::from("CLAUDECODE"), OsString::from("1")),
    ])
}

fn wait_for_exit(handle: &mut ProcessHandle) -> i32 {
    handle
        .wait(Duration::from_secs(10))
        .unwrap()
        .expect("agent did not exit")
}

#[test]
fn test_build_invocation_trailing_argument() {
    let spec = sh_agent("a", "echo hi", PromptDelivery::TrailingArgument);
    let ws = PathBuf::from("/ws");
    let log = PathBuf::from("/log");

    let inv = build_invocation(&spec, Path::new("/bin/sh"), "do the thing", vars(&ws, &log));
    assert_eq!(inv.program, PathBuf::from("/bin/sh"));
    assert_eq!(inv.args, vec!["-c", "echo hi", "do the thing"]);
    assert_eq!(inv.stdin, None);
}

#[test]
fn test_build_invocation_stdin_renders_placeholders() {
    let mut spec = sh_agent("a", "cat", PromptDelivery::Stdin);
    spec.args = vec![
        ArgTemplate::literal("run"),
        ArgTemplate::literal("--dir"),
        ArgTemplate::from(Placeholder::Workspace),
        ArgTemplate::parse("--log={log_file}").unwrap(),
    ];
    let ws = PathBuf::from("/ws/verify-a-t");
    let log = PathBuf::from("/logs/a.log");

    let inv = build_invocation(&spec, Path::new("/usr/bin/agent"), "prompt", vars(&ws, &log));
    assert_eq!(
        inv.args,
        vec!["run", "--dir", "/ws/verify-a-t", "--log=/logs/a.log"]
    );
    assert_eq!(inv.stdin.as_deref(), Some("prompt"));
}

#[test]
fn test_sanitized_env_strips_markers_and_applies_overrides() {
    let mut spec = sh_agent("a", "true", PromptDelivery::Stdin);
    spec.unset_env = vec!["SECRET".to_string()];
    spec.environment
        .insert("MODE".to_string(), "agent".to_string());

    let env = sanitized_env(
        env_pairs(&[
            ("PATH", "/bin"),
            ("CLAUDECODE", "1"),
            ("CLAUDE_CODE_ENTRYPOINT", "cli"),
            ("SECRET", "hunter2"),
            ("MODE", "ambient"),
        ]),
        &spec,
    );

    assert_eq!(env, env_pairs(&[("PATH", "/bin"), ("MODE", "agent")]));
}

#[test]
fn test_resolve_executable_searches_path() {
    let temp_dir = TempDir::new().unwrap();
    let found = resolve_executable("sh", std::env::var_os("PATH").as_deref());
    assert!(found.is_some_and(|p| p.ends_with("sh")));

    let missing = resolve_executable(
        "definitely-not-an-agent-xyz",
        Some(temp_dir.path().as_os_str()),
    );
    assert_eq!(missing, None);
    assert_eq!(resolve_executable("sh", None), None);
}

#[cfg(unix)]
#[test]
fn test_resolve_executable_requires_exec_bit() {
    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("agent");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();

    let path = script.to_string_lossy().to_string();
    assert_eq!(resolve_executable(&path, None), None);

    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    assert_eq!(resolve_executable(&path, None), Some(script.clone()));
    assert_eq!(
        resolve_executable("agent", Some(temp_dir.path().as_os_str())),
        Some(script)
    );
}

#[test]
fn test_launch_missing_executable_returns_none() {
    let temp_dir = TempDir::new().unwrap();
    let mut spec = sh_agent("ghost", "true", PromptDelivery::Stdin);
    spec.executable = "definitely-not-an-agent-xyz".to_string();
    let log = temp_dir.path().join("logs").join("ghost.log");

    let handle = process_launcher()
        .launch(&spec, "prompt", temp_dir.path(), &log)
        .unwrap();
    assert!(handle.is_none());
    assert!(!log.exists());
}

#[cfg(unix)]
#[test]
fn test_launch_trailing_argument_in_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    let log = temp_dir.path().join("logs").join("a.log");
    let spec = sh_agent(
        "a",
        "printf '%s' \"$0\" > prompt.txt; echo out; echo err >&2",
        PromptDelivery::TrailingArgument,
    );

    let mut handle = process_launcher()
        .launch(&spec, "check the diff", &workspace, &log)
        .unwrap()
        .unwrap();
    assert_eq!(wait_for_exit(&mut handle), 0);

    let prompt = std::fs::read_to_string(workspace.join("prompt.txt")).unwrap();
    assert_eq!(prompt, "check the diff");
    let output = std::fs::read_to_string(&log).unwrap();
    assert!(output.contains("out"));
    assert!(output.contains("err"));
}

#[cfg(unix)]
#[test]
fn test_launch_stdin_delivery() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("a.log");
    let spec = sh_agent("a", "cat > prompt.txt", PromptDelivery::Stdin);

    let mut handle = process_launcher()
        .launch(&spec, "line one\nline two\n", temp_dir.path(), &log)
        .unwrap()
        .unwrap();
    assert_eq!(wait_for_exit(&mut handle), 0);

    let prompt = std::fs::read_to_string(temp_dir.path().join("prompt.txt")).unwrap();
    assert_eq!(prompt, "line one\nline two\n");
}

#[cfg(unix)]
#[test]
fn test_launch_strips_nesting_marker() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("a.log");
    let spec = sh_agent(
        "a",
        "echo \"marker=${CLAUDECODE:-unset}\"",
        PromptDelivery::TrailingArgument,
    );

    let mut handle = process_launcher()
        .launch(&spec, "p", temp_dir.path(), &log)
        .unwrap()
        .unwrap();
    assert_eq!(wait_for_exit(&mut handle), 0);

    let output = std::fs::read_to_string(&log).unwrap();
    assert!(output.contains("marker=unset"), "log was: {output}");
}

#[test]
fn test_launch_refuses_existing_log() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("a.log");
    std::fs::write(&log, "previous run\n").unwrap();
    let spec = sh_agent("a", "true", PromptDelivery::Stdin);

    let err = process_launcher()
        .launch(&spec, "p", temp_dir.path(), &log)
        .unwrap_err();
    assert!(matches!(err, VerifyError::LaunchError(_)));
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "previous run\n");
}
