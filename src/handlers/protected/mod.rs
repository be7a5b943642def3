// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind jwt_auth_middleware, which injects AuthUser.
// Handlers scope all reads, writes and upload prefixes by AuthUser.caller_id.

pub mod notes;
pub mod pets;
pub mod sts;

pub use notes::{add_note, delete_note, get_note_list};
pub use pets::{add_pet, delete_pet, get_pet_list, update_pet};
pub use sts::{sts_pet_avatar, sts_pet_note};
