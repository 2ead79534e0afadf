pub mod form;
pub mod model;

pub use form::{first_error, AnimalUpdate, FieldError, NewAnimal, ParentUpdate, ValidatedUpdate};
pub use model::{Achievement, Animal, AnimalRef, AnimalStatus, Gender, Mate};
