#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: open an account and deposit
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "op, owner, amount, account").unwrap();
    writeln!(csv1, "open, alice@x.com, , ").unwrap();
    writeln!(csv1, "deposit, alice@x.com, 100.0, ").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("fundsflow"));
    cmd1.arg("process").arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(",alice@x.com,100\n"));

    // 2. Second run: deposit again against the same DB path
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "op, owner, amount, account").unwrap();
    writeln!(csv2, "deposit, alice@x.com, 50.0, ").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("fundsflow"));
    cmd2.arg("process").arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // Should have recovered 100.0 and added 50.0 = 150.0
    assert!(stdout2.contains(",alice@x.com,150\n"));

    // 3. History spans both runs
    let mut cmd3 = Command::new(cargo_bin!("fundsflow"));
    cmd3.arg("history")
        .arg("alice@x.com")
        .arg("--kind")
        .arg("deposit")
        .arg("--page-size")
        .arg("1")
        .arg("--db-path")
        .arg(&db_path);

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    let stderr3 = String::from_utf8_lossy(&output3.stderr);
    assert_eq!(stdout3.lines().count(), 2);
    assert!(stdout3.contains(",deposit,100,"));
    assert!(stderr3.contains("page_total=2"));
}
