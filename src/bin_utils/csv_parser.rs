use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use serde::{Deserialize, de::DeserializeOwned};

/// Account to provision.
#[derive(Debug, Deserialize)]
pub struct AccountRow {
    pub account: String,
    pub pin: String,
    pub name: String,
}

/// Transfer request, with the amount as the caller typed it.
#[derive(Debug, Deserialize)]
pub struct TransferRow {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
    pub pin: String,
}

/// Parses a CSV file with a header row into `T`s, paired with the line each
/// row came from.
pub struct CsvRowParser<R, T> {
    iter: DeserializeRecordsIntoIter<R, T>,
}

impl<R, T> CsvRowParser<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R, T> Iterator for CsvRowParser<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    type Item = (u64, Result<T, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_keeping_leading_zeros() {
        let input = "sender, receiver, amount, pin\nalice, bob, 12.50, 0123\nalice,bob\n";
        let rows: Vec<_> = CsvRowParser::<_, TransferRow>::new(input.as_bytes()).collect();
        assert_eq!(rows.len(), 2);

        let row = rows[0].1.as_ref().unwrap();
        assert_eq!(row.sender, "alice");
        assert_eq!(row.receiver, "bob");
        assert_eq!(row.amount, "12.50");
        assert_eq!(row.pin, "0123");

        // short row is reported, not fatal
        assert!(rows[1].1.is_err());
    }
}
