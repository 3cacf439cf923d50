pub mod conversation;
pub mod enums;
pub mod knowledge;

pub use conversation::*;
pub use knowledge::*;
