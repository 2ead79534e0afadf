use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::AnimalId;

/// Sex of an animal. Anything other than `MALE`/`FEMALE` reads as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Parse a gender code. Accepts `MALE`/`M` and `FEMALE`/`F` in any case.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" | "M" => Gender::Male,
            "FEMALE" | "F" => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    /// Wire code, `None` when unknown.
    pub fn code(self) -> Option<&'static str> {
        match self {
            Gender::Male => Some("MALE"),
            Gender::Female => Some("FEMALE"),
            Gender::Unknown => None,
        }
    }
}

impl From<Option<String>> for Gender {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Gender::parse).unwrap_or_default()
    }
}

impl From<Gender> for Option<String> {
    fn from(value: Gender) -> Self {
        value.code().map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnimalStatus {
    Alive,
    Dead,
}

/// Identity snapshot of one animal at a tree position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalRef {
    pub id: AnimalId,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    pub is_alive: bool,
}

impl AnimalRef {
    /// Name for display, falling back to a placeholder when empty.
    pub fn display_name(&self) -> &str {
        display_name(&self.name)
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "{No name}"
    } else {
        name
    }
}

/// A show result or other distinction recorded against an animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub title: String,
    #[serde(default)]
    pub awarded_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mate {
    pub id: AnimalId,
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub mated_at: NaiveDate,
}

/// Full herd record for one animal, as shown on its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: AnimalId,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub animal_type_code: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub died_at: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub father_id: Option<AnimalId>,
    #[serde(default)]
    pub mother_id: Option<AnimalId>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub mates: Vec<Mate>,
}

impl Animal {
    /// Create a record with only identity fields set.
    pub fn new(id: &str, code: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            gender: Gender::Unknown,
            animal_type_code: None,
            date_of_birth: None,
            died_at: None,
            note: String::new(),
            father_id: None,
            mother_id: None,
            achievements: Vec::new(),
            mates: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.died_at.is_none()
    }

    pub fn status(&self) -> AnimalStatus {
        if self.is_alive() {
            AnimalStatus::Alive
        } else {
            AnimalStatus::Dead
        }
    }

    /// Completed years of age on `today`, or `None` if the birth date is unknown
    /// or lies after `today`.
    pub fn age_years(&self, today: NaiveDate) -> Option<u32> {
        let born = self.date_of_birth?;
        if born > today {
            return None;
        }
        let mut years = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    /// Name for display, falling back to a placeholder when empty.
    pub fn display_name(&self) -> &str {
        display_name(&self.name)
    }

    pub fn to_ref(&self) -> AnimalRef {
        AnimalRef {
            id: self.id.clone(),
            code: self.code.clone(),
            name: self.name.clone(),
            gender: self.gender,
            is_alive: self.is_alive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_gender_parse_variants() {
        assert_eq!(Gender::parse("MALE"), Gender::Male);
        assert_eq!(Gender::parse("m"), Gender::Male);
        assert_eq!(Gender::parse(" female "), Gender::Female);
        assert_eq!(Gender::parse("F"), Gender::Female);
        assert_eq!(Gender::parse(""), Gender::Unknown);
        assert_eq!(Gender::parse("castrate"), Gender::Unknown);
    }

    #[test]
    fn test_gender_json_null_is_unknown() {
        let r: AnimalRef = serde_json::from_str(
            r#"{"id": "a1", "code": "AAA-001", "name": "Bella", "gender": null, "isAlive": true}"#,
        )
        .unwrap();
        assert_eq!(r.gender, Gender::Unknown);

        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, "\"FEMALE\"");
        let json = serde_json::to_string(&Gender::Unknown).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn test_age_years_respects_birthday() {
        let mut a = Animal::new("a1", "AAA-001", "Bella");
        a.date_of_birth = Some(date(2020, 6, 15));
        assert_eq!(a.age_years(date(2023, 6, 14)), Some(2));
        assert_eq!(a.age_years(date(2023, 6, 15)), Some(3));
        assert_eq!(a.age_years(date(2019, 1, 1)), None);
    }

    #[test]
    fn test_status_and_ref_follow_died_at() {
        let mut a = Animal::new("a1", "AAA-001", "");
        assert_eq!(a.status(), AnimalStatus::Alive);
        assert_eq!(a.display_name(), "{No name}");

        a.died_at = Some(date(2024, 2, 1));
        assert_eq!(a.status(), AnimalStatus::Dead);
        assert!(!a.to_ref().is_alive);
        assert_eq!(a.to_ref().display_name(), "{No name}");
    }

    #[test]
    fn test_animal_deserializes_camel_case() {
        let a: Animal = serde_json::from_str(
            r#"{
                "id": "a1",
                "code": "AAA-001",
                "name": "Bella",
                "gender": "FEMALE",
                "dateOfBirth": "2021-03-04",
                "fatherId": "a0",
                "mates": [{"id": "m1", "code": "AAA-003", "name": "Jack", "matedAt": "2022-01-01"}]
            }"#,
        )
        .unwrap();
        assert_eq!(a.gender, Gender::Female);
        assert_eq!(a.date_of_birth, Some(date(2021, 3, 4)));
        assert_eq!(a.father_id.as_deref(), Some("a0"));
        assert_eq!(a.mother_id, None);
        assert_eq!(a.mates.len(), 1);
        assert!(a.is_alive());
    }
}
