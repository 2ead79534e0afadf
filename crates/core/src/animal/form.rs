//! Client-side validation of animal create/edit forms.
//!
//! Every validator collects all field errors rather than stopping at the
//! first, so a form can flag each offending input at once. Nothing that fails
//! here should be sent on to the herd directory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::HerdbookError;
use crate::types::AnimalId;

use super::model::{Animal, Gender};

const MAX_CODE_LEN: usize = 32;
const MAX_NAME_LEN: usize = 128;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<FieldError> for HerdbookError {
    fn from(e: FieldError) -> Self {
        HerdbookError::Validation {
            field: e.field.to_string(),
            message: e.message,
        }
    }
}

/// Collapse a list of field errors into the first one as a crate error.
pub fn first_error(errors: Vec<FieldError>) -> HerdbookError {
    errors
        .into_iter()
        .next()
        .map(HerdbookError::from)
        .unwrap_or_else(|| HerdbookError::Data("validation failed".to_string()))
}

fn check_code(code: &str, errors: &mut Vec<FieldError>) {
    let code = code.trim();
    if code.is_empty() {
        errors.push(FieldError::new("code", "must not be empty"));
    } else if code.chars().count() > MAX_CODE_LEN {
        errors.push(FieldError::new(
            "code",
            format!("must be at most {} characters", MAX_CODE_LEN),
        ));
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.trim().chars().count() > MAX_NAME_LEN {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
}

fn parse_date(
    field: &'static str,
    raw: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push(FieldError::new(field, "must be a date in YYYY-MM-DD form"));
            None
        }
    }
}

/// Body of the "Add Animal" dialog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnimal {
    #[serde(default)]
    pub animal_type_code: Option<String>,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl NewAnimal {
    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self
            .animal_type_code
            .as_deref()
            .map_or(true, |c| c.trim().is_empty())
        {
            errors.push(FieldError::new("animalTypeCode", "is required"));
        }
        check_code(&self.code, &mut errors);
        check_name(&self.name, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of the detail-page edit form. Dates arrive as `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalUpdate {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub animal_type_code: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub died_at: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub note: Option<String>,
}

/// An [`AnimalUpdate`] that passed validation, with dates parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpdate {
    pub code: String,
    pub name: String,
    pub animal_type_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub died_at: Option<NaiveDate>,
    pub gender: Gender,
    pub note: Option<String>,
}

impl AnimalUpdate {
    /// Validate against the calendar day `today`; neither date may lie after it.
    pub fn validate(&self, today: NaiveDate) -> std::result::Result<ValidatedUpdate, Vec<FieldError>> {
        let mut errors = Vec::new();
        check_code(&self.code, &mut errors);
        check_name(&self.name, &mut errors);

        let born = parse_date("dateOfBirth", self.date_of_birth.as_deref(), &mut errors);
        let died = parse_date("diedAt", self.died_at.as_deref(), &mut errors);

        if born.is_some_and(|d| d > today) {
            errors.push(FieldError::new("dateOfBirth", "must not be in the future"));
        }
        if died.is_some_and(|d| d > today) {
            errors.push(FieldError::new("diedAt", "must not be in the future"));
        }
        if let (Some(b), Some(d)) = (born, died) {
            if d < b {
                errors.push(FieldError::new("diedAt", "must not be before date of birth"));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedUpdate {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            animal_type_code: self.animal_type_code.clone(),
            date_of_birth: born,
            died_at: died,
            gender: self.gender,
            note: self.note.clone(),
        })
    }
}

impl ValidatedUpdate {
    /// Write the edited fields onto an existing record. The animal type is
    /// fixed at creation and left untouched when the form omits it.
    pub fn apply_to(&self, animal: &mut Animal) {
        animal.code = self.code.clone();
        animal.name = self.name.clone();
        if self.animal_type_code.is_some() {
            animal.animal_type_code = self.animal_type_code.clone();
        }
        animal.date_of_birth = self.date_of_birth;
        animal.died_at = self.died_at;
        animal.gender = self.gender;
        if let Some(note) = &self.note {
            animal.note = note.clone();
        }
    }
}

/// Body of the parents section: either parent may be cleared with `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentUpdate {
    #[serde(default)]
    pub father_id: Option<AnimalId>,
    #[serde(default)]
    pub mother_id: Option<AnimalId>,
}

impl ParentUpdate {
    /// Validate parents of `animal_id`. `gender_of` looks up a candidate parent's
    /// gender and returns `None` for ids the directory does not know.
    pub fn validate<F>(&self, animal_id: &str, gender_of: F) -> std::result::Result<(), Vec<FieldError>>
    where
        F: Fn(&str) -> Option<Gender>,
    {
        let mut errors = Vec::new();
        let father = self.father_id.as_deref().filter(|s| !s.is_empty());
        let mother = self.mother_id.as_deref().filter(|s| !s.is_empty());

        if father == Some(animal_id) {
            errors.push(FieldError::new("fatherId", "an animal cannot be its own father"));
        }
        if mother == Some(animal_id) {
            errors.push(FieldError::new("motherId", "an animal cannot be its own mother"));
        }
        if father.is_some() && father == mother {
            errors.push(FieldError::new("motherId", "father and mother must differ"));
        }

        if let Some(f) = father {
            match gender_of(f) {
                None => errors.push(FieldError::new("fatherId", format!("unknown animal '{}'", f))),
                Some(Gender::Female) => errors.push(FieldError::new("fatherId", "father must be male")),
                Some(_) => {}
            }
        }
        if let Some(m) = mother {
            match gender_of(m) {
                None => errors.push(FieldError::new("motherId", format!("unknown animal '{}'", m))),
                Some(Gender::Male) => errors.push(FieldError::new("motherId", "mother must be female")),
                Some(_) => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_new_animal_ok() {
        let form = NewAnimal {
            animal_type_code: Some("GOAT".to_string()),
            code: "AAA-001".to_string(),
            name: "Bella".to_string(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_new_animal_collects_all_errors() {
        let form = NewAnimal {
            animal_type_code: None,
            code: "   ".to_string(),
            name: "x".repeat(200),
        };
        let errors = form.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["animalTypeCode", "code", "name"]);
    }

    #[test]
    fn test_update_parses_dates() {
        let form = AnimalUpdate {
            code: " AAA-001 ".to_string(),
            name: "Bella".to_string(),
            date_of_birth: Some("2020-01-31".to_string()),
            died_at: Some("".to_string()),
            gender: Gender::Female,
            ..Default::default()
        };
        let v = form.validate(today()).unwrap();
        assert_eq!(v.code, "AAA-001");
        assert_eq!(v.date_of_birth, NaiveDate::from_ymd_opt(2020, 1, 31));
        assert_eq!(v.died_at, None);
    }

    #[test]
    fn test_update_rejects_bad_dates() {
        let form = AnimalUpdate {
            code: "AAA-001".to_string(),
            date_of_birth: Some("31/01/2020".to_string()),
            died_at: Some("2030-01-01".to_string()),
            ..Default::default()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "dateOfBirth");
        assert_eq!(errors[1].field, "diedAt");
    }

    #[test]
    fn test_update_death_before_birth() {
        let form = AnimalUpdate {
            code: "AAA-001".to_string(),
            date_of_birth: Some("2022-01-01".to_string()),
            died_at: Some("2021-01-01".to_string()),
            ..Default::default()
        };
        let errors = form.validate(today()).unwrap_err();
        assert!(errors[0].message.contains("before date of birth"));
    }

    #[test]
    fn test_apply_keeps_type_when_omitted() {
        let mut animal = Animal::new("a1", "OLD", "Old");
        animal.animal_type_code = Some("SHEEP".to_string());
        let form = AnimalUpdate {
            code: "NEW".to_string(),
            name: "New".to_string(),
            died_at: Some("2024-04-01".to_string()),
            ..Default::default()
        };
        form.validate(today()).unwrap().apply_to(&mut animal);
        assert_eq!(animal.code, "NEW");
        assert_eq!(animal.animal_type_code.as_deref(), Some("SHEEP"));
        assert!(!animal.is_alive());
    }

    #[test]
    fn test_parent_update_rules() {
        let gender_of = |id: &str| match id {
            "sire" => Some(Gender::Male),
            "dam" => Some(Gender::Female),
            "x" => Some(Gender::Unknown),
            _ => None,
        };

        let ok = ParentUpdate {
            father_id: Some("sire".to_string()),
            mother_id: Some("dam".to_string()),
        };
        assert!(ok.validate("kid", gender_of).is_ok());

        let swapped = ParentUpdate {
            father_id: Some("dam".to_string()),
            mother_id: Some("sire".to_string()),
        };
        assert_eq!(swapped.validate("kid", gender_of).unwrap_err().len(), 2);

        let own = ParentUpdate {
            father_id: Some("kid".to_string()),
            mother_id: None,
        };
        let errors = own.validate("kid", gender_of).unwrap_err();
        assert!(errors[0].message.contains("own father"));

        let same = ParentUpdate {
            father_id: Some("x".to_string()),
            mother_id: Some("x".to_string()),
        };
        let errors = same.validate("kid", gender_of).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("must differ"));
    }

    #[test]
    fn test_first_error_converts() {
        let err = first_error(vec![FieldError::new("code", "must not be empty")]);
        assert!(matches!(err, HerdbookError::Validation { ref field, .. } if field == "code"));
    }
}
