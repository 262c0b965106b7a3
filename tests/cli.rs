use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("reelscribe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("download-model"));
}

#[test]
fn malformed_url_exits_with_failure() {
    Command::cargo_bin("reelscribe")
        .unwrap()
        .args(["--quiet", "transcribe", "not a url"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Bad URL"));
}

#[test]
fn non_reel_url_is_rejected_without_network() {
    Command::cargo_bin("reelscribe")
        .unwrap()
        .args(["--quiet", "transcribe", "https://example.com/video/123"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Not an Instagram Reel URL"));
}
