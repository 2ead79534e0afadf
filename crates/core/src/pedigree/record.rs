use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animal::{Animal, AnimalRef, Gender};
use crate::data::{field, parse_parent, CsvTable};
use crate::error::Result;
use crate::types::AnimalId;

/// One unvalidated ancestor record: an animal plus its immediate parent links.
///
/// Parent ids may point at animals that are not part of the same batch; the
/// tree builder treats those as unknown ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAncestorRecord {
    pub id: AnimalId,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    /// Death timestamp as delivered by the source; only its presence matters.
    #[serde(default)]
    pub died_at: Option<String>,
    #[serde(default)]
    pub father_id: Option<AnimalId>,
    #[serde(default)]
    pub mother_id: Option<AnimalId>,
}

impl RawAncestorRecord {
    /// Record with no attributes and no parents.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// Set both parent links, `None` meaning unknown.
    pub fn with_parents(mut self, father: Option<&str>, mother: Option<&str>) -> Self {
        self.father_id = father.map(str::to_string);
        self.mother_id = mother.map(str::to_string);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Father id, ignoring blank and `"0"`/`"NA"` placeholders.
    pub fn father(&self) -> Option<String> {
        self.father_id.as_deref().and_then(parse_parent)
    }

    /// Mother id, ignoring blank and `"0"`/`"NA"` placeholders.
    pub fn mother(&self) -> Option<String> {
        self.mother_id.as_deref().and_then(parse_parent)
    }

    pub fn is_alive(&self) -> bool {
        self.died_at.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Reference for a tree node; the id is trimmed to match the key the
    /// builder resolves it under.
    pub fn to_animal_ref(&self) -> AnimalRef {
        AnimalRef {
            id: self.id.trim().to_string(),
            code: self.code.clone(),
            name: self.name.clone(),
            gender: self.gender,
            is_alive: self.is_alive(),
        }
    }
}

impl From<&Animal> for RawAncestorRecord {
    fn from(a: &Animal) -> Self {
        Self {
            id: a.id.clone(),
            code: a.code.clone(),
            name: a.name.clone(),
            gender: a.gender,
            died_at: a.died_at.map(|d| d.to_string()),
            father_id: a.father_id.clone(),
            mother_id: a.mother_id.clone(),
        }
    }
}

/// Read ancestor records from a CSV file.
///
/// Expected columns (header required): `id` (or `animal`), and optionally
/// `code`, `name`, `gender`, `died_at`, `father` (or `sire`), `mother`
/// (or `dam`). Unknown parents are coded as `"0"`, `""`, or `"NA"`.
///
/// # Errors
/// Returns an error if the file cannot be read or the id column is missing.
pub fn read_records_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawAncestorRecord>> {
    records_from_table(&CsvTable::from_path(path)?)
}

/// Same as [`read_records_csv`] for in-memory or streamed content.
pub fn read_records_csv_from<R: Read>(rdr: R) -> Result<Vec<RawAncestorRecord>> {
    records_from_table(&CsvTable::from_reader(rdr)?)
}

/// Read ancestor records from a JSON array.
pub fn read_records_json<R: Read>(rdr: R) -> Result<Vec<RawAncestorRecord>> {
    Ok(serde_json::from_reader(rdr)?)
}

fn records_from_table(table: &CsvTable) -> Result<Vec<RawAncestorRecord>> {
    let id_col = table.require_column(&["id", "animal"])?;
    let code_col = table.column(&["code"]);
    let name_col = table.column(&["name"]);
    let gender_col = table.column(&["gender", "sex"]);
    let died_col = table.column(&["died_at", "diedat"]);
    let father_col = table.column(&["father", "father_id", "fatherid", "sire"]);
    let mother_col = table.column(&["mother", "mother_id", "motherid", "dam"]);

    let mut records = Vec::with_capacity(table.nrows());
    for row in table.rows() {
        let Some(id) = field(row, Some(id_col)) else {
            log::warn!("Skipping CSV row without an animal id");
            continue;
        };
        records.push(RawAncestorRecord {
            id: id.to_string(),
            code: field(row, code_col).unwrap_or_default().to_string(),
            name: field(row, name_col).unwrap_or_default().to_string(),
            gender: field(row, gender_col).map(Gender::parse).unwrap_or_default(),
            died_at: field(row, died_col).map(str::to_string),
            father_id: field(row, father_col).and_then(parse_parent),
            mother_id: field(row, mother_col).and_then(parse_parent),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_with_sire_dam_columns() {
        let csv = "animal,sire,dam\n1,0,0\n2,0,0\n3,1,2\n";
        let records = read_records_csv_from(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].father().as_deref(), Some("1"));
        assert_eq!(records[2].mother().as_deref(), Some("2"));
        assert_eq!(records[0].father(), None);
    }

    #[test]
    fn test_animal_ref_id_is_trimmed() {
        let record = RawAncestorRecord::new(" A ").with_name("Bella");
        let animal = record.to_animal_ref();
        assert_eq!(animal.id, "A");
        assert_eq!(animal.display_name(), "Bella");
    }

    #[test]
    fn test_csv_full_columns() {
        let csv = "id,code,name,gender,died_at,father,mother\n\
                   a1,AAA-001,Bella,FEMALE,,a0,NA\n\
                   a0,AAA-000,Max,MALE,2023-04-01,,\n";
        let records = read_records_csv_from(csv.as_bytes()).unwrap();
        let bella = &records[0];
        assert_eq!(bella.code, "AAA-001");
        assert_eq!(bella.gender, Gender::Female);
        assert!(bella.is_alive());
        assert_eq!(bella.mother(), None);
        assert!(!records[1].is_alive());
    }

    #[test]
    fn test_csv_missing_id_column() {
        let csv = "code,name\nAAA-001,Bella\n";
        let err = read_records_csv_from(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_json_camel_case() {
        let json = r#"[
            {"id": "A", "code": "A-1", "fatherId": "B", "motherId": null},
            {"id": "B", "diedAt": "2021-09-01T00:00:00Z", "gender": "MALE"}
        ]"#;
        let records = read_records_json(json.as_bytes()).unwrap();
        assert_eq!(records[0].father().as_deref(), Some("B"));
        assert_eq!(records[0].mother(), None);
        assert!(!records[1].to_animal_ref().is_alive);
        assert_eq!(records[1].gender, Gender::Male);
    }

    #[test]
    fn test_placeholder_parent_ids_are_unknown() {
        let r = RawAncestorRecord::new("A").with_parents(Some("0"), Some(" "));
        assert_eq!(r.father(), None);
        assert_eq!(r.mother(), None);
    }
}
