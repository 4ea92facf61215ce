pub mod candidates;
pub mod error;
pub mod refine;
pub mod resolve;
