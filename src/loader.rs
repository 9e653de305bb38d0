use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::canonical::canonicalize;
use crate::error::LoadError;
use crate::models::LeadRecord;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    LeadDate,
    WeekStart,
    WeekLabel,
    Dealer,
    Region,
    Location,
    LeadRef,
}

impl Field {
    const REQUIRED: [Field; 5] = [
        Field::LeadDate,
        Field::WeekStart,
        Field::WeekLabel,
        Field::Dealer,
        Field::Region,
    ];

    fn name(&self) -> &'static str {
        match self {
            Field::LeadDate => "lead_date",
            Field::WeekStart => "week_start",
            Field::WeekLabel => "week_label",
            Field::Dealer => "dealer",
            Field::Region => "region",
            Field::Location => "location",
            Field::LeadRef => "lead_ref",
        }
    }

    // Compared after `header_key` normalization.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::LeadDate => &["leaddate", "date"],
            Field::WeekStart => &["weekstart", "weekstartdate", "weekbeginning"],
            Field::WeekLabel => &["weeklabel", "week", "weeknumber", "reportingweek"],
            Field::Dealer => &["dealer", "dealerwebsite", "website", "dealername"],
            Field::Region => &["state", "region", "territory"],
            Field::Location => &["location", "suburb", "city"],
            Field::LeadRef => &["leadid", "leadref", "id"],
        }
    }
}

fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column positions for every field we could resolve from the header row.
#[derive(Debug, Clone)]
struct ColumnMap {
    lead_date: usize,
    week_start: usize,
    week_label: usize,
    dealer: usize,
    region: usize,
    location: Option<usize>,
    lead_ref: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let keys: Vec<String> = headers.iter().map(header_key).collect();
        let find = |field: Field| {
            field
                .aliases()
                .iter()
                .find_map(|alias| keys.iter().position(|key| key.as_str() == *alias))
        };

        let required = Field::REQUIRED.map(|field| (field, find(field)));
        match required.map(|(_, index)| index) {
            [Some(lead_date), Some(week_start), Some(week_label), Some(dealer), Some(region)] => {
                Ok(Self {
                    lead_date,
                    week_start,
                    week_label,
                    dealer,
                    region,
                    location: find(Field::Location),
                    lead_ref: find(Field::LeadRef),
                })
            }
            _ => Err(LoadError::MissingFields {
                missing: required
                    .iter()
                    .filter(|(_, index)| index.is_none())
                    .map(|(field, _)| field.name().to_string())
                    .collect(),
                found: headers.iter().map(str::to_string).collect(),
            }),
        }
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|stamp| stamp.date())
        })
}

fn cell<'r>(record: &'r csv::StringRecord, index: usize) -> &'r str {
    record.get(index).map(str::trim).unwrap_or_default()
}

fn required_date(
    record: &csv::StringRecord,
    index: usize,
    row: usize,
    field: Field,
) -> Result<NaiveDate, LoadError> {
    let raw = cell(record, index);
    if raw.is_empty() {
        return Err(LoadError::EmptyValue {
            row,
            field: field.name(),
        });
    }
    parse_date(raw).ok_or_else(|| LoadError::InvalidDate {
        row,
        field: field.name(),
        value: raw.to_string(),
    })
}

/// Reads lead rows from any CSV source. Rows are numbered from 1, excluding
/// the header.
pub fn load_reader<R: Read>(source: R) -> Result<Vec<LeadRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::resolve(&headers)?;
    tracing::debug!(?columns, "resolved csv columns");

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        let record = result?;

        let lead_date = required_date(&record, columns.lead_date, row, Field::LeadDate)?;
        let week_start = required_date(&record, columns.week_start, row, Field::WeekStart)?;
        if week_start > lead_date {
            return Err(LoadError::WeekAfterLead {
                row,
                week_start,
                lead_date,
            });
        }

        let week_label = cell(&record, columns.week_label).to_string();
        if week_label.is_empty() {
            return Err(LoadError::EmptyValue {
                row,
                field: Field::WeekLabel.name(),
            });
        }

        let location = columns
            .location
            .map(|index| cell(&record, index).to_string())
            .unwrap_or_default();
        let source_ref = columns
            .lead_ref
            .map(|index| cell(&record, index))
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        records.push(LeadRecord {
            id: records.len(),
            lead_date,
            week_start,
            week_label,
            dealer: cell(&record, columns.dealer).to_string(),
            region: cell(&record, columns.region).to_string(),
            location_canonical: canonicalize(&location),
            location,
            source_ref,
        });
    }

    Ok(records)
}

pub fn load_path(path: &Path) -> Result<Vec<LeadRecord>, LoadError> {
    let file = std::fs::File::open(path)?;
    let records = load_reader(file)?;
    tracing::info!(path = %path.display(), rows = records.len(), "loaded lead csv");
    Ok(records)
}

pub fn load_store(path: &Path) -> Result<RecordStore, LoadError> {
    RecordStore::new(load_path(path)?)
}
