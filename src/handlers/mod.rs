// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (bearer token, caller-scoped)

pub mod protected;
pub mod public;
