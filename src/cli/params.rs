use tabled::Table;

use crate::{types::ParamTableRow, utils::SUPPORTED_EXTRA_PARAMS};

/// Lists the extra `--param key=value` names the API is known to accept.
pub fn params() {
    let rows: Vec<ParamTableRow> = SUPPORTED_EXTRA_PARAMS
        .iter()
        .map(|&(name, kind, description)| ParamTableRow {
            name,
            kind,
            description,
        })
        .collect();

    println!("{}", Table::new(rows));
}
