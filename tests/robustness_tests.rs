use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn dues_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id, member, period, amount_due, amount_paid").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

fn payments_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "payment, member, amount, method, bank_account, date, notes").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

#[test]
fn test_malformed_payment_rows_are_skipped() {
    let dues = dues_file(&["1, 1, 2024-01, 100, "]);
    let payments = payments_file(&[
        "1, 1, 10.0, cash, 1, , ",
        // Not a number
        "2, 1, not_a_number, cash, 1, , ",
        // Zero amount
        "3, 1, 0, cash, 1, , ",
        // Missing method
        "4, 1, 5.0, , 1, , ",
        "5, 1, 20.0, cash, 1, , ",
    ]);

    Command::new(cargo_bin!("fininvest"))
        .arg("settle")
        .arg(dues.path())
        .arg(payments.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading payment"))
        .stderr(predicate::str::contains("Amount must be positive"))
        .stdout(predicate::str::contains("1,1,2024-01,100.00,30.00,partial"));
}

#[test]
fn test_duplicate_payment_is_not_applied_twice() {
    let dues = dues_file(&["1, 1, 2024-01, 100, "]);
    let payments = payments_file(&["7, 1, 10.0, cash, 1, , ", "7, 1, 10.0, cash, 1, , "]);

    Command::new(cargo_bin!("fininvest"))
        .arg("settle")
        .arg(dues.path())
        .arg(payments.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error processing payment"))
        .stdout(predicate::str::contains("1,1,2024-01,100.00,10.00,partial"));
}

#[test]
fn test_invalid_dues_are_skipped() {
    let dues = dues_file(&[
        "1, 1, 2024-01, 100, ",
        // Bad period
        "2, 1, 2024-13, 100, ",
        // Paid more than due
        "3, 1, 2024-02, 100, 150",
        // Duplicate id
        "1, 1, 2024-03, 100, ",
    ]);
    let payments = payments_file(&[]);

    Command::new(cargo_bin!("fininvest"))
        .arg("settle")
        .arg(dues.path())
        .arg(payments.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading due"))
        .stderr(predicate::str::contains("Skipping due"))
        .stdout(predicate::eq(
            "id,member,period,amount_due,amount_paid,status\n1,1,2024-01,100.00,0.00,unpaid\n",
        ));
}

#[test]
fn test_missing_input_file_fails() {
    Command::new(cargo_bin!("fininvest"))
        .args(["settle", "does_not_exist.csv", "tests/fixtures/payments.csv"])
        .assert()
        .failure();
}

#[test]
fn test_payment_restricted_to_selected_dues() {
    let dues = dues_file(&["1, 1, 2024-01, 100, ", "2, 1, 2024-02, 100, "]);
    let mut payments = NamedTempFile::new().unwrap();
    writeln!(payments, "payment, member, amount, method, bank_account, date, notes, dues").unwrap();
    writeln!(payments, "1, 1, 100, cash, 1, , , 2").unwrap();
    writeln!(payments, "2, 1, 30, cash, 1, , , ").unwrap();

    Command::new(cargo_bin!("fininvest"))
        .arg("settle")
        .arg(dues.path())
        .arg(payments.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,1,2024-01,100.00,30.00,partial"))
        .stdout(predicate::str::contains("2,1,2024-02,100.00,100.00,paid"));
}
