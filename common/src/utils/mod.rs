pub mod cursor;
pub mod mutf8;
pub mod telemetry;
