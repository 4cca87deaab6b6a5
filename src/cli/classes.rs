use comfy_table::{Cell, Table};

use cxp::db::{load_classifications, save_classifications};
use cxp::error::Result;

use super::open_db;

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let classes = load_classifications(&conn)?;
    let mut table = Table::new();
    table.set_header(vec!["#", "Clasificación"]);
    for (i, label) in classes.labels().iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(label)]);
    }
    println!("Clasificaciones\n{table}");
    Ok(())
}

pub fn add(name: &str) -> Result<()> {
    let (_, mut conn) = open_db()?;
    let mut classes = load_classifications(&conn)?;
    if classes.add(name) {
        save_classifications(&mut conn, &classes)?;
        println!("Added classification: {}", name.trim());
    } else {
        println!("Classification already exists: {}", name.trim());
    }
    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let (_, mut conn) = open_db()?;
    let mut classes = load_classifications(&conn)?;
    classes.remove(name)?;
    save_classifications(&mut conn, &classes)?;
    println!("Removed classification: {name}");
    Ok(())
}

pub fn rename(from: &str, to: &str) -> Result<()> {
    let (_, mut conn) = open_db()?;
    let mut classes = load_classifications(&conn)?;
    classes.rename(from, to)?;
    save_classifications(&mut conn, &classes)?;
    println!("Renamed classification: {from} -> {}", to.trim());
    Ok(())
}
