//! CSV import service
//!
//! Parses bank account exports into transactions and merges them into the
//! working set. Bank formats differ in where the header line sits and what
//! the columns are called, so each supported institute gets a
//! [`CsvModel`] describing its layout. German number and date formats are
//! expected throughout ("31.01.2023", "1.234,56").

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EntryFilter, LedgerDate, Money, Transaction};
use crate::store::{keys, KeyedStore};

/// Semantic meaning of a CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvColumnType {
    Date,
    /// Recipient and sender usually share one column
    RecipientSender,
    /// Booking type, like "Lastschrift" or "Überweisung"
    Kind,
    Description,
    Balance,
    Value,
    Currency,
}

/// One expected column of a bank export
#[derive(Debug, Clone)]
pub struct CsvColumn {
    pub name: &'static str,
    pub kind: CsvColumnType,
}

/// Layout of a bank's CSV export
#[derive(Debug, Clone)]
pub struct CsvModel {
    /// 1-based line number carrying the column names
    pub label_line: usize,
    /// 1-based line number of the first data row
    pub start_line: usize,
    pub columns: Vec<CsvColumn>,
}

impl CsvModel {
    /// Export layout of ING
    pub fn ing() -> Self {
        Self {
            label_line: 14,
            start_line: 15,
            columns: vec![
                CsvColumn { name: "Buchung", kind: CsvColumnType::Date },
                CsvColumn { name: "Auftraggeber/Empfänger", kind: CsvColumnType::RecipientSender },
                CsvColumn { name: "Buchungstext", kind: CsvColumnType::Kind },
                CsvColumn { name: "Verwendungszweck", kind: CsvColumnType::Description },
                CsvColumn { name: "Saldo", kind: CsvColumnType::Balance },
                CsvColumn { name: "Betrag", kind: CsvColumnType::Value },
                CsvColumn { name: "Währung", kind: CsvColumnType::Currency },
            ],
        }
    }

    /// Export layout of Postbank
    ///
    /// Postbank exports carry no running balance, so the "Betrag" column
    /// feeds both the value and the balance field.
    pub fn postbank() -> Self {
        Self {
            label_line: 8,
            start_line: 9,
            columns: vec![
                CsvColumn { name: "Buchungstag", kind: CsvColumnType::Date },
                CsvColumn { name: "Begünstigter / Auftraggeber", kind: CsvColumnType::RecipientSender },
                CsvColumn { name: "Umsatzart", kind: CsvColumnType::Kind },
                CsvColumn { name: "Verwendungszweck", kind: CsvColumnType::Description },
                CsvColumn { name: "Betrag", kind: CsvColumnType::Balance },
                CsvColumn { name: "Betrag", kind: CsvColumnType::Value },
                CsvColumn { name: "Währung", kind: CsvColumnType::Currency },
            ],
        }
    }

    /// Look up the model for a bank identifier
    pub fn for_bank(bank_id: &str) -> LedgerResult<Self> {
        match bank_id {
            "ing" => Ok(Self::ing()),
            "postbank" => Ok(Self::postbank()),
            other => Err(LedgerError::Import(format!("Unknown bank '{other}'"))),
        }
    }
}

/// Parse a bank export into transactions
///
/// Header columns are matched case-insensitively by substring, since banks
/// decorate column names with quotes or extra whitespace. A column the model
/// names but the file lacks fails the whole import; a data row that does not
/// parse is logged and skipped.
pub fn parse_csv(text: &str, model: &CsvModel) -> LedgerResult<Vec<Transaction>> {
    // Line numbers in the models count raw file lines, blank ones included,
    // so the file is split before any CSV parsing happens.
    let lines: Vec<&str> = text.lines().collect();
    let header_line = lines.get(model.label_line - 1).ok_or_else(|| {
        LedgerError::Import(format!("File has no header line {}", model.label_line))
    })?;
    let header = parse_line(header_line)?;
    let indices = resolve_columns(model, &header)?;

    let mut transactions = Vec::new();
    for line in lines.iter().skip(model.start_line - 1) {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = parse_line(line).and_then(|record| parse_record(&record, &indices));
        match parsed {
            Ok(transaction) => transactions.push(transaction),
            Err(error) => {
                warn!(%error, row = line, "Skipping unparsable row");
            }
        }
    }
    Ok(transactions)
}

/// Parse a single semicolon-separated line, honoring quoted fields
fn parse_line(line: &str) -> LedgerResult<csv::StringRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    reader
        .records()
        .next()
        .transpose()
        .map_err(|e| LedgerError::Import(e.to_string()))?
        .ok_or_else(|| LedgerError::Import("Empty line".to_string()))
}

/// Column indices in a parsed record, in model column order
struct ResolvedColumns {
    date: usize,
    recipient_sender: usize,
    kind: usize,
    description: usize,
    balance: usize,
    value: usize,
    currency: usize,
}

fn resolve_columns(model: &CsvModel, header: &csv::StringRecord) -> LedgerResult<ResolvedColumns> {
    let find = |column: &CsvColumn| -> LedgerResult<usize> {
        let needle = column.name.to_lowercase();
        header
            .iter()
            .position(|field| field.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                LedgerError::Import(format!("Column \"{}\" not found in the file", column.name))
            })
    };
    let index_of = |kind: CsvColumnType| -> LedgerResult<usize> {
        let column = model
            .columns
            .iter()
            .find(|c| c.kind == kind)
            .ok_or_else(|| LedgerError::Import(format!("Model lacks a {kind:?} column")))?;
        find(column)
    };
    Ok(ResolvedColumns {
        date: index_of(CsvColumnType::Date)?,
        recipient_sender: index_of(CsvColumnType::RecipientSender)?,
        kind: index_of(CsvColumnType::Kind)?,
        description: index_of(CsvColumnType::Description)?,
        balance: index_of(CsvColumnType::Balance)?,
        value: index_of(CsvColumnType::Value)?,
        currency: index_of(CsvColumnType::Currency)?,
    })
}

fn parse_record(record: &csv::StringRecord, indices: &ResolvedColumns) -> LedgerResult<Transaction> {
    let field = |index: usize| -> LedgerResult<&str> {
        record
            .get(index)
            .map(str::trim)
            .ok_or_else(|| LedgerError::Import(format!("Row is missing column {index}")))
    };
    Ok(Transaction {
        date: LedgerDate::parse(field(indices.date)?)?,
        recipient_sender: field(indices.recipient_sender)?.to_string(),
        kind: field(indices.kind)?.to_string(),
        description: field(indices.description)?.to_string(),
        balance: Money::parse_german(field(indices.balance)?)?,
        value: Money::parse_german(field(indices.value)?)?,
        currency: field(indices.currency)?.to_string(),
    })
}

/// Merge imported transactions into the existing set
///
/// Duplicates are detected by the transaction's identity key, both against
/// the existing set and within the imported batch itself, so importing the
/// same file twice never grows the ledger. The result is sorted newest
/// first.
pub fn merge_imported(
    existing: Vec<Transaction>,
    imported: Vec<Transaction>,
) -> Vec<Transaction> {
    let mut seen: HashSet<String> = existing.iter().map(Transaction::dedup_key).collect();
    let mut merged = existing;
    for transaction in imported {
        if seen.insert(transaction.dedup_key()) {
            merged.push(transaction);
        }
    }
    merged.sort_by(|a, b| b.date.cmp(&a.date));
    merged
}

/// Service gluing CSV parsing and merge to the store
pub struct ImportService<'a> {
    store: &'a KeyedStore,
}

impl<'a> ImportService<'a> {
    pub fn new(store: &'a KeyedStore) -> Self {
        Self { store }
    }

    /// Import a bank export into the working entries
    ///
    /// The entry filter is reset to its unbounded default so freshly
    /// imported months are not hidden by a stale month range. Returns the
    /// number of transactions actually added.
    pub fn import_csv(&self, text: &str, bank_id: &str) -> LedgerResult<usize> {
        let model = CsvModel::for_bank(bank_id)?;
        let imported = parse_csv(text, &model)?;
        let existing: Vec<Transaction> = self.store.get(keys::ENTRIES).unwrap_or_default();
        let before = existing.len();

        let merged = merge_imported(existing, imported);
        let added = merged.len() - before;
        self.store.set(keys::ENTRIES, &merged)?;
        self.store.set(keys::ENTRY_FILTER, &EntryFilter::default())?;
        info!(bank = bank_id, added, total = merged.len(), "Imported CSV file");
        Ok(added)
    }
}
