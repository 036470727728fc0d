pub mod phone;
pub mod schema;
pub mod validate;
