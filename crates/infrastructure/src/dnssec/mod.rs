pub mod crypto;
pub mod denial;
pub mod trust_anchor;
pub mod types;
pub mod validation;
pub mod zone;

pub use crypto::SignatureVerifier;
pub use denial::{DenialProof, DenialProver};
pub use trust_anchor::TrustAnchorStore;
pub use types::{DnskeyRecord, DsRecord};
pub use zone::Zone;
