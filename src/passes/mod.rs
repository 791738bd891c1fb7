//! The three semantic passes (§4.5–§4.7), run in fixed order by
//! [`crate::compile`]: [`symbol_pass`] builds scopes and symbols,
//! [`typecheck_pass`] decorates every expression with a type and l-value
//! bit, [`codegen_pass`] lowers the checked tree into [`crate::instr::Listing`].

pub mod codegen_pass;
pub mod symbol_pass;
pub mod typecheck_pass;
