//! Security policy applied before any write: template trust, signed
//! includes, and path jails.
pub mod paths;
pub mod signature;
pub mod trust;

pub use signature::{GpgVerifier, SignaturePolicy, SignatureReport, SignatureVerifier, Verification};
pub use trust::TrustPolicy;
