pub mod clear;
pub mod daemon;
pub mod delete;
pub mod list;
pub mod select;
pub mod show;
pub mod status;
