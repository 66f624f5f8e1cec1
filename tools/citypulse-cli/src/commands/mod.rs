pub mod config;
pub mod export;
pub mod io;
pub mod query;
pub mod run;
pub mod stages;
