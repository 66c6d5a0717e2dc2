use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_boundary_numerical_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("boundary_test.csv");
    common::write_operations(
        &path,
        &[
            ["open", "whale@x.com", "", ""],
            ["deposit", "whale@x.com", "1000000000000.0000", ""],
            ["withdraw", "whale@x.com", "1000000000000", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("fundsflow"));
    cmd.arg("process").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",whale@x.com,0\n"));
}

#[test]
fn test_extreme_decimal_precision() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("precision_test.csv");
    common::write_operations(
        &path,
        &[
            ["open", "alice@x.com", "", ""],
            ["deposit", "alice@x.com", "0.0001", ""],
            ["deposit", "alice@x.com", "0.0001", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("fundsflow"));
    cmd.arg("process").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",alice@x.com,0.0002\n"));
}

#[test]
fn test_withdraw_exact_balance_to_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exact_test.csv");
    common::write_operations(
        &path,
        &[
            ["open", "alice@x.com", "", ""],
            ["deposit", "alice@x.com", "10.5", ""],
            ["withdraw", "alice@x.com", "10.5", ""],
            ["withdraw", "alice@x.com", "0.0001", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("fundsflow"));
    cmd.arg("process").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",alice@x.com,0\n"))
        .stderr(predicate::str::contains("Insufficient balance"));
}

#[test]
fn test_balance_overflow_is_reported_per_row() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overflow_test.csv");
    common::write_operations(
        &path,
        &[
            ["open", "alice@x.com", "", ""],
            ["deposit", "alice@x.com", "50000000000000000000000000000.0", ""],
            ["deposit", "alice@x.com", "50000000000000000000000000000.0", ""],
            ["deposit", "alice@x.com", "1", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("fundsflow"));
    cmd.arg("process").arg(&path);

    // The overflowing row is rejected and the rows after it still apply
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("number,owner,balance"))
        .stdout(predicate::str::contains(
            ",alice@x.com,50000000000000000000000000001\n",
        ))
        .stderr(predicate::str::contains("Balance overflow"));
}
