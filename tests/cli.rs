use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cxp(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cxp").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn setup() -> TempDir {
    let home = TempDir::new().unwrap();
    let data = home.path().join("data");
    cxp(&home)
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized cxp at"));
    home
}

fn add_invoice(home: &TempDir, proveedor: &str, folio: &str, extra: &[&str]) -> String {
    let out = cxp(home)
        .args(["invoices", "add", "--proveedor", proveedor, "--fecha", "2026-02-01"])
        .args(["--subtotal", "1000", "--folio", folio])
        .args(extra)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    text.split_whitespace()
        .nth(2)
        .expect("invoice id in output")
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let home = setup();
    assert!(home.path().join("data").join("cxp.db").exists());
    assert!(home.path().join(".config").join("cxp").join("settings.json").exists());
}

#[test]
fn test_add_and_list_invoice() {
    let home = setup();
    add_invoice(&home, "ACME", "A-1", &[]);

    cxp(&home)
        .args(["invoices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACME"))
        .stdout(predicate::str::contains("$1,160.00"))
        .stdout(predicate::str::contains("03/03/2026"));
}

#[test]
fn test_list_with_json_filter() {
    let home = setup();
    add_invoice(&home, "ACME", "A-1", &[]);
    add_invoice(&home, "Globex", "G-1", &[]);

    cxp(&home)
        .args(["invoices", "list", "--filter", r#"{"proveedor":"Globex"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Globex"))
        .stdout(predicate::str::contains("ACME").not());
}

#[test]
fn test_duplicate_folio_is_reported() {
    let home = setup();
    add_invoice(&home, "ACME", "A-1", &[]);
    add_invoice(&home, "Otro", "A-1", &["--currency", "USD"]);

    cxp(&home)
        .args(["invoices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("folios duplicados"));

    cxp(&home)
        .arg("duplicates")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 groups, 2 invoices involved"));
}

#[test]
fn test_pay_marks_invoice_paid() {
    let home = setup();
    let id = add_invoice(&home, "ACME", "A-1", &[]);

    cxp(&home)
        .args(["invoices", "pay", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("saldo $0.00, estatus Pagado"));

    cxp(&home)
        .args(["projection"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to project."));
}

#[test]
fn test_projection_uses_scheduled_date() {
    let home = setup();
    add_invoice(&home, "ACME", "A-1", &["--programacion", "2026-03-02"]);

    cxp(&home)
        .arg("projection")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lun 02/03"))
        .stdout(predicate::str::contains("$1,160.00"));
}

#[test]
fn test_classes_seeded_and_editable() {
    let home = setup();
    cxp(&home)
        .args(["classes", "add", "Fletes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added classification: Fletes"));

    cxp(&home)
        .args(["classes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fletes"))
        .stdout(predicate::str::contains("Otros"));
}

#[test]
fn test_supplier_defaults_flow_into_invoice() {
    let home = setup();
    cxp(&home)
        .args(["suppliers", "add", "Globex", "--moneda", "USD", "--dias-credito", "15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added supplier: Globex"));

    add_invoice(&home, "Globex", "G-1", &[]);

    cxp(&home)
        .args(["invoices", "list", "--currency", "USD"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Globex"))
        .stdout(predicate::str::contains("16/02/2026"));
}

#[test]
fn test_aging_reports_overdue_balance() {
    let home = setup();
    add_invoice(&home, "ACME", "A-1", &[]);

    cxp(&home)
        .args(["aging", "--currency", "MXN", "--today", "2026-04-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$1,160.00"));
}

#[test]
fn test_unknown_currency_fails() {
    let home = setup();
    cxp(&home)
        .args(["invoices", "list", "--currency", "GBP"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_import_csv() {
    let home = setup();
    let csv = home.path().join("facturas.csv");
    std::fs::write(
        &csv,
        "Fecha,Serie,Folio,Proveedor,Subtotal,IVA,Total\n\
         2026-01-10,A,100,ACME,1000,160,1160\n\
         2026-01-11,A,100,ACME,1000,160,1160\n",
    )
    .unwrap();

    cxp(&home)
        .args(["import", csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 imported"))
        .stdout(predicate::str::contains("1 skipped"));
}
