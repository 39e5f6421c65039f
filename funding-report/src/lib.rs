pub mod cli;
pub mod config;
pub mod logger;
pub mod merge;
pub mod report;
pub mod run;
pub mod sink;
pub mod window;
