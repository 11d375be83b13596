pub mod annotations;
pub mod app;
pub mod catalogue;
pub mod chrome;
pub mod config;
pub mod filters;
pub mod grid;
pub mod html;
pub mod offline;
pub mod pages;
pub mod related;
pub mod seo;
pub mod storage;
