pub mod access_keys;
pub mod buckets;
pub mod health;
pub mod login;
pub mod tenants;
pub mod users;
