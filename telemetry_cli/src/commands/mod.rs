pub mod history;
pub mod mock;
pub mod serve;
pub mod validate;
