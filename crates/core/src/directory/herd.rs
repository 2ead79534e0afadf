use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};

use crate::animal::form::first_error;
use crate::animal::{Achievement, Animal, AnimalUpdate, Gender, Mate, NewAnimal, ParentUpdate};
use crate::data::{field, parse_parent, CsvTable};
use crate::error::{HerdbookError, Result};
use crate::pedigree::RawAncestorRecord;
use crate::types::AnimalId;

use super::{AnimalDirectory, AnimalPage, AnimalQuery, PedigreeTreeQuery};

/// In-memory herd register.
///
/// Animals keep their insertion order; list queries sort by code. Parent
/// links are stored as ids and are not required to resolve, mirroring
/// registers where only part of the lineage has been recorded.
#[derive(Debug, Clone, Default)]
pub struct Herd {
    animals: IndexMap<AnimalId, Animal>,
    next_serial: u64,
}

impl Herd {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns an error on duplicate animal ids.
    pub fn from_animals<I: IntoIterator<Item = Animal>>(animals: I) -> Result<Self> {
        let mut herd = Self::new();
        for animal in animals {
            herd.insert(animal)?;
        }
        Ok(herd)
    }

    /// Read a herd from a CSV file.
    ///
    /// Expected columns (header required): `id` (or `animal`), and optionally
    /// `code`, `name`, `gender`, `animal_type`, `date_of_birth`, `died_at`,
    /// `father` (or `sire`), `mother` (or `dam`), `note`. Dates use
    /// `YYYY-MM-DD`; a blank code falls back to the id.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a date is malformed, or
    /// duplicate animal ids are found.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_table(&CsvTable::from_path(path)?)
    }

    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Self> {
        Self::from_table(&CsvTable::from_reader(rdr)?)
    }

    fn from_table(table: &CsvTable) -> Result<Self> {
        let id_col = table.require_column(&["id", "animal"])?;
        let code_col = table.column(&["code"]);
        let name_col = table.column(&["name"]);
        let gender_col = table.column(&["gender", "sex"]);
        let type_col = table.column(&["animal_type", "animal_type_code", "type"]);
        let born_col = table.column(&["date_of_birth", "born"]);
        let died_col = table.column(&["died_at", "died"]);
        let father_col = table.column(&["father", "father_id", "sire"]);
        let mother_col = table.column(&["mother", "mother_id", "dam"]);
        let note_col = table.column(&["note", "notes"]);

        let mut herd = Self::new();
        for row in table.rows() {
            let id = field(row, Some(id_col))
                .ok_or_else(|| HerdbookError::Data("Missing animal id in row".to_string()))?;

            let mut animal = Animal::new(id, field(row, code_col).unwrap_or(id), field(row, name_col).unwrap_or_default());
            animal.gender = field(row, gender_col).map(Gender::parse).unwrap_or_default();
            animal.animal_type_code = field(row, type_col).map(str::to_string);
            animal.date_of_birth = parse_csv_date(id, field(row, born_col))?;
            animal.died_at = parse_csv_date(id, field(row, died_col))?;
            animal.father_id = field(row, father_col).and_then(parse_parent);
            animal.mother_id = field(row, mother_col).and_then(parse_parent);
            animal.note = field(row, note_col).unwrap_or_default().to_string();

            herd.insert(animal)?;
        }
        log::debug!("Loaded herd of {} animals", herd.len());
        Ok(herd)
    }

    /// Add a fully formed record.
    ///
    /// # Errors
    /// Returns an error if the animal ID already exists.
    pub fn insert(&mut self, animal: Animal) -> Result<()> {
        if self.animals.contains_key(&animal.id) {
            return Err(HerdbookError::Data(format!(
                "Duplicate animal ID: '{}'",
                animal.id
            )));
        }
        self.animals.insert(animal.id.clone(), animal);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }

    pub fn animals(&self) -> impl Iterator<Item = &Animal> {
        self.animals.values()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Animal> {
        self.animals
            .get_mut(id)
            .ok_or_else(|| HerdbookError::NotFound(id.to_string()))
    }

    fn code_taken(&self, code: &str, except: Option<&str>) -> bool {
        self.animals
            .values()
            .any(|a| a.code == code && Some(a.id.as_str()) != except)
    }

    fn next_id(&mut self) -> AnimalId {
        loop {
            self.next_serial += 1;
            let id = format!("A-{:06}", self.next_serial);
            if !self.animals.contains_key(&id) {
                return id;
            }
        }
    }

    /// Apply an edit from the details form.
    pub fn update(&mut self, id: &str, form: &AnimalUpdate, today: NaiveDate) -> Result<Animal> {
        let validated = form.validate(today).map_err(first_error)?;
        if self.code_taken(&validated.code, Some(id)) {
            return Err(HerdbookError::Validation {
                field: "code".to_string(),
                message: format!("'{}' is already in use", validated.code),
            });
        }
        let animal = self.get_mut(id)?;
        validated.apply_to(animal);
        Ok(animal.clone())
    }

    /// Replace both parent links.
    pub fn set_parents(&mut self, id: &str, form: &ParentUpdate) -> Result<Animal> {
        if !self.animals.contains_key(id) {
            return Err(HerdbookError::NotFound(id.to_string()));
        }
        form.validate(id, |pid| self.animals.get(pid).map(|a| a.gender))
            .map_err(first_error)?;

        let animal = self.get_mut(id)?;
        animal.father_id = form.father_id.clone().filter(|s| !s.is_empty());
        animal.mother_id = form.mother_id.clone().filter(|s| !s.is_empty());
        Ok(animal.clone())
    }

    pub fn set_note(&mut self, id: &str, note: &str) -> Result<()> {
        self.get_mut(id)?.note = note.to_string();
        Ok(())
    }

    pub fn add_achievement(&mut self, id: &str, achievement: Achievement) -> Result<()> {
        if achievement.title.trim().is_empty() {
            return Err(HerdbookError::Validation {
                field: "title".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        self.get_mut(id)?.achievements.push(achievement);
        Ok(())
    }

    /// Record a mating of `id` with `mate_id`; the snapshot is taken from the
    /// mate's current record.
    pub fn add_mate(&mut self, id: &str, mate_id: &str, mated_at: NaiveDate) -> Result<()> {
        if id == mate_id {
            return Err(HerdbookError::Validation {
                field: "mateId".to_string(),
                message: "an animal cannot be mated with itself".to_string(),
            });
        }
        let mate = self
            .animals
            .get(mate_id)
            .map(|m| Mate {
                id: m.id.clone(),
                code: m.code.clone(),
                name: m.name.clone(),
                mated_at,
            })
            .ok_or_else(|| HerdbookError::NotFound(mate_id.to_string()))?;
        self.get_mut(id)?.mates.push(mate);
        Ok(())
    }
}

fn parse_csv_date(id: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            HerdbookError::Data(format!("Invalid date '{}' for animal '{}'", s, id))
        })
    })
    .transpose()
}

impl AnimalDirectory for Herd {
    fn list(&self, query: &AnimalQuery) -> Result<AnimalPage> {
        let limit = query.limit.max(1);
        let page = query.page.max(1);

        let mut matched: Vec<&Animal> = self.animals.values().filter(|a| query.matches(a)).collect();
        matched.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.id.cmp(&b.id)));

        let start = (page - 1).saturating_mul(limit);
        let docs = matched
            .iter()
            .skip(start)
            .take(limit)
            .map(|a| a.to_ref())
            .collect();

        Ok(AnimalPage {
            docs,
            limit,
            page,
            has_next_page: matched.len() > start.saturating_add(limit),
        })
    }

    fn get(&self, id: &str) -> Result<Animal> {
        self.animals
            .get(id)
            .cloned()
            .ok_or_else(|| HerdbookError::NotFound(id.to_string()))
    }

    fn create(&mut self, body: &NewAnimal) -> Result<Animal> {
        body.validate().map_err(first_error)?;
        let code = body.code.trim();
        if self.code_taken(code, None) {
            return Err(HerdbookError::Validation {
                field: "code".to_string(),
                message: format!("'{}' is already in use", code),
            });
        }

        let id = self.next_id();
        let mut animal = Animal::new(&id, code, body.name.trim());
        animal.animal_type_code = body.animal_type_code.clone();
        self.insert(animal.clone())?;
        log::debug!("Created animal '{}' with code '{}'", id, code);
        Ok(animal)
    }
}

impl PedigreeTreeQuery for Herd {
    /// Breadth-first walk over parent links, each animal emitted once.
    fn ancestors(&self, animal_id_eq: &str, level: u32) -> Result<Vec<RawAncestorRecord>> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        queue.push_back((animal_id_eq, 0));

        while let Some((id, depth)) = queue.pop_front() {
            let Some(animal) = self.animals.get(id) else { continue };
            if !seen.insert(animal.id.as_str()) {
                continue;
            }
            if depth < level {
                for parent in [animal.father_id.as_deref(), animal.mother_id.as_deref()]
                    .into_iter()
                    .flatten()
                {
                    queue.push_back((parent, depth + 1));
                }
            }
        }

        Ok(seen
            .into_iter()
            .filter_map(|id| self.animals.get(id))
            .map(RawAncestorRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERD_CSV: &str = "\
id,code,name,gender,animal_type,date_of_birth,died_at,father,mother,note
a1,AAA-001,Bella,FEMALE,GOAT,2021-03-04,,a2,a3,
a2,AAA-002,Max,MALE,GOAT,2018-01-01,2023-05-01,a4,,
a3,AAA-003,Daisy,FEMALE,GOAT,,,0,NA,calm
a4,AAA-004,Rex,MALE,GOAT,,,,,
";

    fn herd() -> Herd {
        Herd::from_csv_reader(HERD_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_from_csv() {
        let h = herd();
        assert_eq!(h.len(), 4);
        let a2 = h.get("a2").unwrap();
        assert_eq!(a2.gender, Gender::Male);
        assert!(!a2.is_alive());
        assert_eq!(a2.father_id.as_deref(), Some("a4"));
        let a3 = h.get("a3").unwrap();
        assert_eq!(a3.father_id, None);
        assert_eq!(a3.note, "calm");
    }

    #[test]
    fn test_from_csv_bad_date() {
        let csv = "id,date_of_birth\na1,04/03/2021\n";
        let err = Herd::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
    }

    #[test]
    fn test_from_csv_duplicate_id() {
        let csv = "id,code\na1,X\na1,Y\n";
        let err = Herd::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_list_paging() {
        let h = herd();
        let page = h.list(&AnimalQuery::default().limit(3)).unwrap();
        assert_eq!(page.docs.len(), 3);
        assert!(page.has_next_page);
        assert_eq!(page.docs[0].code, "AAA-001");

        let page = h.list(&AnimalQuery::default().limit(3).page(2)).unwrap();
        assert_eq!(page.docs.len(), 1);
        assert!(!page.has_next_page);

        let page = h.list(&AnimalQuery::default().gender(Gender::Male)).unwrap();
        let codes: Vec<&str> = page.docs.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["AAA-002", "AAA-004"]);
    }

    #[test]
    fn test_create_validates_and_assigns_id() {
        let mut h = herd();
        let created = h
            .create(&NewAnimal {
                animal_type_code: Some("GOAT".to_string()),
                code: " AAA-005 ".to_string(),
                name: "Luna".to_string(),
            })
            .unwrap();
        assert_eq!(created.id, "A-000001");
        assert_eq!(created.code, "AAA-005");
        assert_eq!(h.len(), 5);

        let dup = h.create(&NewAnimal {
            animal_type_code: Some("GOAT".to_string()),
            code: "AAA-001".to_string(),
            name: String::new(),
        });
        assert!(matches!(dup, Err(HerdbookError::Validation { .. })));

        let invalid = h.create(&NewAnimal::default());
        assert!(matches!(invalid, Err(HerdbookError::Validation { .. })));
        assert_eq!(h.len(), 5);
    }

    #[test]
    fn test_set_parents_checks_gender() {
        let mut h = herd();
        let err = h
            .set_parents(
                "a4",
                &ParentUpdate {
                    father_id: Some("a3".to_string()),
                    mother_id: None,
                },
            )
            .unwrap_err();
        assert!(err.user_message().contains("male"));

        let updated = h
            .set_parents(
                "a4",
                &ParentUpdate {
                    father_id: Some("a2".to_string()),
                    mother_id: Some("a3".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.mother_id.as_deref(), Some("a3"));
    }

    #[test]
    fn test_update_rejects_taken_code() {
        let mut h = herd();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let form = AnimalUpdate {
            code: "AAA-002".to_string(),
            ..Default::default()
        };
        assert!(h.update("a1", &form, today).is_err());

        let form = AnimalUpdate {
            code: "AAA-001".to_string(),
            name: "Bella II".to_string(),
            ..Default::default()
        };
        assert_eq!(h.update("a1", &form, today).unwrap().name, "Bella II");
    }

    #[test]
    fn test_notes_achievements_mates() {
        let mut h = herd();
        h.set_note("a1", "prefers hay").unwrap();
        h.add_achievement(
            "a1",
            Achievement {
                title: "Best in show".to_string(),
                awarded_at: None,
            },
        )
        .unwrap();
        let day = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        h.add_mate("a1", "a4", day).unwrap();
        assert!(h.add_mate("a1", "a1", day).is_err());
        assert!(h.add_mate("a1", "zz", day).is_err());

        let a1 = h.get("a1").unwrap();
        assert_eq!(a1.note, "prefers hay");
        assert_eq!(a1.achievements.len(), 1);
        assert_eq!(a1.mates[0].code, "AAA-004");
    }

    #[test]
    fn test_ancestors_bounded_by_level() {
        let h = herd();
        let ids = |level| -> Vec<String> {
            h.ancestors("a1", level)
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect()
        };
        assert_eq!(ids(0), vec!["a1"]);
        assert_eq!(ids(1), vec!["a1", "a2", "a3"]);
        assert_eq!(ids(2), vec!["a1", "a2", "a3", "a4"]);
        assert!(h.ancestors("nobody", 3).unwrap().is_empty());
    }

    #[test]
    fn test_ancestors_terminates_on_cycle() {
        let mut a = Animal::new("x", "X", "");
        a.father_id = Some("y".to_string());
        let mut b = Animal::new("y", "Y", "");
        b.father_id = Some("x".to_string());
        let h = Herd::from_animals([a, b]).unwrap();
        assert_eq!(h.ancestors("x", 10).unwrap().len(), 2);
    }
}
