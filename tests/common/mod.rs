use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_imon") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "imon.exe" } else { "imon" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve imon binary path for integration test"),
    }
}

/// Run `imon` with `args` from the current directory.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run(case_name, None, &[], args)
}

/// Run `imon` inside `workdir`, with `HOME` pointed there so no user config
/// file is picked up. Relative store paths resolve inside `workdir`.
pub fn run_cli_case_in(case_name: &str, workdir: &Path, args: &[&str]) -> CmdResult {
    run(case_name, Some(workdir), &[], args)
}

/// [`run_cli_case_in`] with extra environment variables.
pub fn run_cli_case_in_env(
    case_name: &str,
    workdir: &Path,
    env: &[(&str, &str)],
    args: &[&str],
) -> CmdResult {
    run(case_name, Some(workdir), env, args)
}

fn run(case_name: &str, workdir: Option<&Path>, env: &[(&str, &str)], args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("imon-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env_remove("IMON_OUTPUT_FORMAT")
        .env_remove("IMON_BASELINE_FILE")
        .env_remove("IMON_HISTORY_FILE")
        .env_remove("IMON_ALERT_LOG")
        .env_remove("IMON_SPOOF_SEED_POLICY")
        .env_remove("IMON_HASH_ALGORITHM");
    if let Some(dir) = workdir {
        command.current_dir(dir).env("HOME", dir);
    }
    command.envs(env.iter().copied());
    let output = command.output().expect("execute imon command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("env={env:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
