pub mod dnskey;
pub mod ds;

pub use dnskey::{count_key_roles, DnskeyRecord};
pub use ds::DsRecord;
