pub mod base;
pub mod goodinfo;
pub mod tpex;
pub mod twse;
