pub mod note;
pub mod pet;

pub use note::{Note, NoteInput, NoteRow};
pub use pet::{Pet, PetInput};
