pub mod descriptor;
pub mod error;
pub mod jtype;
pub mod utils;
