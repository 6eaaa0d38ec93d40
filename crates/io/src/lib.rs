// File I/O operations

pub mod catalog;
pub mod export;
pub mod pages;
pub mod read;
