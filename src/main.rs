mod cli;

use clap::Parser;

use cli::invoices::{ListArgs, SetArgs};
use cli::suppliers::SupplierArgs;
use cli::{ClassesCommands, Cli, Commands, InvoicesCommands, SuppliersCommands};

fn main() {
    cxp::logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Invoices { command } => match command {
            InvoicesCommands::List {
                currency,
                filter,
                proveedor,
                clasificacion,
                estatus,
                from,
                to,
                pago_from,
                pago_to,
                search,
                group_by,
                then_by,
            } => cli::invoices::list(ListArgs {
                currency,
                filter,
                proveedor,
                clasificacion,
                estatus,
                from,
                to,
                pago_from,
                pago_to,
                search,
                group_by,
                then_by,
            }),
            InvoicesCommands::Add(args) => cli::invoices::add(args),
            InvoicesCommands::Set {
                id,
                currency,
                clasificacion,
                concepto,
                programacion,
                estatus,
                pagado,
            } => cli::invoices::set(SetArgs {
                id,
                currency,
                clasificacion,
                concepto,
                programacion,
                estatus,
                pagado,
            }),
            InvoicesCommands::Pay { id, currency, amount } => {
                cli::invoices::pay(&id, currency.as_deref(), amount)
            }
            InvoicesCommands::Vobo {
                id,
                currency,
                direccion,
            } => cli::invoices::vobo(&id, currency.as_deref(), direccion),
            InvoicesCommands::Move { id, from, to } => cli::invoices::move_to(&id, from.as_deref(), &to),
            InvoicesCommands::Delete { id, currency } => cli::invoices::delete(&id, currency.as_deref()),
            InvoicesCommands::Bulk {
                currency,
                ids,
                clasificacion,
                programacion,
                estatus,
            } => cli::invoices::bulk(currency.as_deref(), &ids, clasificacion, programacion, estatus),
        },
        Commands::Duplicates { delete } => cli::reports::duplicates(&delete),
        Commands::Aging { currency, today } => cli::reports::aging(currency.as_deref(), today),
        Commands::Projection { from, to, search } => cli::reports::projection(from, to, search),
        Commands::Summary { today } => cli::reports::summary(today),
        Commands::Suppliers { command } => match command {
            SuppliersCommands::Add {
                nombre,
                rfc,
                moneda,
                dias_credito,
                clasificacion,
                contacto,
                telefono,
                email,
                banco,
                clabe,
                inactivo,
            } => cli::suppliers::add(SupplierArgs {
                nombre,
                rfc,
                moneda,
                dias_credito,
                clasificacion,
                contacto,
                telefono,
                email,
                banco,
                clabe,
                inactivo,
            }),
            SuppliersCommands::List => cli::suppliers::list(),
        },
        Commands::Classes { command } => match command {
            ClassesCommands::List => cli::classes::list(),
            ClassesCommands::Add { name } => cli::classes::add(&name),
            ClassesCommands::Remove { name } => cli::classes::remove(&name),
            ClassesCommands::Rename { from, to } => cli::classes::rename(&from, &to),
        },
        Commands::Import { file } => cli::import::run(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
