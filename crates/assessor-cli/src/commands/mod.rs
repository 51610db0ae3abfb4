pub mod init;
pub mod report;
pub mod run;
pub mod score;
pub mod status;
pub mod validate;
