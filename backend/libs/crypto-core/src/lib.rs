pub mod jwt;

pub use jwt::{Claims, HmacJwt, Subject};
