//! Domain layer for the AEAD data protection provider.

pub mod key_material;
pub mod protector;
pub mod provider;

pub use key_material::parse_master_key;
pub use protector::AeadDataProtector;
pub use provider::AeadProtectionProvider;
