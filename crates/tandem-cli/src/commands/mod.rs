pub mod add;
pub mod assign;
pub mod claim;
pub mod common;
pub mod complete;
pub mod delete;
pub mod list;
pub mod status;
pub mod sync;
pub mod update;
