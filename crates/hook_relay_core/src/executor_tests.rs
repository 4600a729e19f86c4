use super::*;
use crate::resolver::HookOrigin;
use serde_json::json;

#[test]
fn test_invocation_arguments_are_payload_then_event() {
    let invocation = HookInvocation::new("/srv/hooks/all", Path::new("/tmp/payload.json"), "push");

    assert_eq!(invocation.program, PathBuf::from("/srv/hooks/all"));
    assert_eq!(
        invocation.args,
        [OsString::from("/tmp/payload.json"), OsString::from("push")]
    );
}

#[test]
fn test_payload_file_holds_json_and_is_removed_on_drop() {
    let payload = json!({ "ref": "refs/heads/main", "deleted": false });

    let payload_file = PayloadFile::create(&payload).unwrap();
    let path = payload_file.path().to_path_buf();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, payload);

    drop(payload_file);
    assert!(!path.exists());
}

#[test]
fn test_launch_failure_codes() {
    let missing = io::Error::from(io::ErrorKind::NotFound);
    let denied = io::Error::from(io::ErrorKind::PermissionDenied);

    assert_eq!(ExecutionResult::launch_failure(&missing).returncode, EXIT_NOT_FOUND);
    assert_eq!(ExecutionResult::launch_failure(&denied).returncode, EXIT_NOT_EXECUTABLE);
    assert!(ExecutionResult::launch_failure(&denied)
        .stderr
        .starts_with("failed to launch hook"));
}

#[test]
fn test_execution_result_serializes_like_script_report() {
    let result = ExecutionResult {
        returncode: 0,
        stdout: "ok\n".to_string(),
        stderr: String::new(),
    };

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({ "returncode": 0, "stdout": "ok\n", "stderr": "" })
    );
}

#[cfg(unix)]
mod unix_tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str) -> HookCandidate {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write hook");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to set hook permissions");
        HookCandidate {
            path,
            origin: HookOrigin::Direct,
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_hook_receives_payload_file_and_event() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "push", r#"cat "$1"; echo; echo "$2""#);
        let payload = json!({ "repository": { "name": "myrepo" } });

        let results = HookExecutor::default()
            .execute(&[hook], &payload, "push")
            .await
            .unwrap();

        let result = &results["push"];
        assert_eq!(result.returncode, 0);
        let mut lines = result.stdout.lines();
        let received: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(received, payload);
        assert_eq!(lines.next(), Some("push"));
    }

    #[tokio::test]
    #[serial]
    async fn test_output_streams_are_captured_separately() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "all", "echo out; echo err >&2");

        let results = HookExecutor::default()
            .execute(&[hook], &json!({}), "issues")
            .await
            .unwrap();

        assert_eq!(results["all"].stdout, "out\n");
        assert_eq!(results["all"].stderr, "err\n");
    }

    #[tokio::test]
    #[serial]
    async fn test_failing_hook_does_not_stop_later_hooks() {
        let temp_dir = TempDir::new().unwrap();
        let failing = write_script(temp_dir.path(), "push", "echo broken >&2; exit 2");
        let later = write_script(temp_dir.path(), "all", "echo still ran");

        let results = HookExecutor::default()
            .execute(&[failing, later], &json!({}), "push")
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results["push"].returncode, 2);
        assert_eq!(results["push"].stderr, "broken\n");
        assert_eq!(results["all"].returncode, 0);
        assert_eq!(results["all"].stdout, "still ran\n");
    }

    #[tokio::test]
    #[serial]
    async fn test_hooks_run_sequentially_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("order.log");
        let first = write_script(
            temp_dir.path(),
            "push",
            &format!("sleep 0.2; echo first >> '{}'", log.display()),
        );
        let second = write_script(
            temp_dir.path(),
            "all",
            &format!("echo second >> '{}'", log.display()),
        );

        HookExecutor::default()
            .execute(&[first, second], &json!({}), "push")
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(&log).unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    #[serial]
    async fn test_payload_file_is_removed_after_batch() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "all", r#"echo "$1""#);

        let results = HookExecutor::default()
            .execute(&[hook], &json!({}), "push")
            .await
            .unwrap();

        let payload_path = PathBuf::from(results["all"].stdout.trim());
        assert!(payload_path.is_absolute());
        assert!(!payload_path.exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_vanished_hook_is_recorded_and_batch_continues() {
        let temp_dir = TempDir::new().unwrap();
        let vanished = HookCandidate {
            path: temp_dir.path().join("push"),
            origin: HookOrigin::Direct,
        };
        let later = write_script(temp_dir.path(), "all", "echo ok");

        let results = HookExecutor::default()
            .execute(&[vanished, later], &json!({}), "push")
            .await
            .unwrap();

        assert_eq!(results["push"].returncode, EXIT_NOT_FOUND);
        assert!(!results["push"].stderr.is_empty());
        assert_eq!(results["all"].returncode, 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_non_executable_hook_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "push", "echo never");
        fs::set_permissions(&hook.path, fs::Permissions::from_mode(0o644)).unwrap();

        let results = HookExecutor::default()
            .execute(&[hook], &json!({}), "push")
            .await
            .unwrap();

        assert_eq!(results["push"].returncode, EXIT_NOT_EXECUTABLE);
    }

    #[tokio::test]
    #[serial]
    async fn test_hook_exceeding_timeout_is_killed() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "push", "exec sleep 10");
        let executor = HookExecutor::new(Some(Duration::from_millis(200)));

        let started = std::time::Instant::now();
        let results = executor.execute(&[hook], &json!({}), "push").await.unwrap();

        assert_eq!(results["push"].returncode, EXIT_TIMED_OUT);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    fn is_running(pid: i32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        // An unreaped zombie still answers signal 0.
        match fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(true),
            Err(_) => true,
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_timeout_kills_background_processes_started_by_hook() {
        let temp_dir = TempDir::new().unwrap();
        let pid_file = temp_dir.path().join("background.pid");
        let hook = write_script(
            temp_dir.path(),
            "push",
            &format!(
                "sleep 30 >/dev/null 2>&1 &\necho $! > '{}'\nwait",
                pid_file.display()
            ),
        );
        let executor = HookExecutor::new(Some(Duration::from_millis(300)));

        let results = executor.execute(&[hook], &json!({}), "push").await.unwrap();
        assert_eq!(results["push"].returncode, EXIT_TIMED_OUT);

        let background: i32 = fs::read_to_string(&pid_file)
            .expect("Hook did not record its background process")
            .trim()
            .parse()
            .unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while is_running(background) && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!is_running(background), "background sleep {background} survived the timeout");
    }

    #[tokio::test]
    #[serial]
    async fn test_signal_termination_is_reported_shell_style() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "push", "kill -9 $$");

        let results = HookExecutor::default()
            .execute(&[hook], &json!({}), "push")
            .await
            .unwrap();

        assert_eq!(results["push"].returncode, 128 + 9);
    }

    #[tokio::test]
    #[serial]
    async fn test_non_utf8_output_is_decoded_lossily() {
        let temp_dir = TempDir::new().unwrap();
        let hook = write_script(temp_dir.path(), "push", r"printf 'ok\377'");

        let results = HookExecutor::default()
            .execute(&[hook], &json!({}), "push")
            .await
            .unwrap();

        assert_eq!(results["push"].stdout, "ok\u{FFFD}");
    }
}
