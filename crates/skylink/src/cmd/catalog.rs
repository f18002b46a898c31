use skylink_schema::Catalog;

use crate::cmd::generate::load_schema;
use crate::cmd::CatalogArgs;
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: CatalogArgs) -> CliResult<i32> {
    let schema = load_schema(&args.files, false)?;
    let catalog = Catalog::from_schema(&schema);
    let json = catalog
        .to_json_pretty()
        .map_err(|err| CliError::new(INTERNAL, format!("catalog serialization failed: {err}")))?;

    match args.out {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .map_err(|err| io_error(&format!("write {}", path.display()), err))?;
            tracing::info!(path = %path.display(), packets = catalog.len(), "catalog written");
        }
        None => println!("{json}"),
    }

    Ok(SUCCESS)
}
