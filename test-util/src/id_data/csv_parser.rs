use crate::id_data::Error;

use itertools::process_results;
use serde::de::DeserializeOwned;
use std::io::Read;

pub(super) fn records_from_reader<R, Rec>(reader: R) -> Result<Vec<Rec>, Error>
where
    R: Read,
    Rec: DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);
    let records: Vec<Rec> = process_results(csv_reader.deserialize(), |iter| iter.collect())?;
    Ok(records)
}
