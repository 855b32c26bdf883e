pub mod access;
pub mod product;
pub mod request;
pub mod user;
