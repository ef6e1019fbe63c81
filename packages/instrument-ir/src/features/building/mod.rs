//! Instruction construction
//!
//! `InstructionSeq` is the append-only builder every pass composes with;
//! `inspect` classifies existing instructions at candidate call sites.

pub mod inspect;
pub mod sequence;

pub use sequence::InstructionSeq;
