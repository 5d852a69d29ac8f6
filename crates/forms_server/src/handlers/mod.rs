pub mod definition;
pub mod forms;
pub mod health;
pub mod lifecycle;
pub mod secrets;
pub mod versions;
