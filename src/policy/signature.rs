// src/policy/signature.rs

//! Signature/trust policy
//!
//! Classifies the raw verification result the engine reports when a
//! package file is read. The classification is a pure function of the
//! result code, the policy mode, and the file name; an unrecognized code
//! is never accepted in either mode.

/// Raw signature-verification result reported by the engine.
///
/// The numeric mapping in [`VerifyResult::from_code`] follows librpm's
/// `rpmRC` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature present and fully verified.
    Ok,
    /// No signature found in the package.
    NotFound,
    /// Signature present but does not verify.
    Fail,
    /// Signature verified against an untrusted key.
    NotTrusted,
    /// The signing key is unavailable.
    NoKey,
    /// A code this layer does not recognize.
    Unknown(i32),
}

impl VerifyResult {
    /// Map an engine's numeric result code onto the closed enumeration.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => VerifyResult::Ok,
            1 => VerifyResult::NotFound,
            2 => VerifyResult::Fail,
            3 => VerifyResult::NotTrusted,
            4 => VerifyResult::NoKey,
            other => VerifyResult::Unknown(other),
        }
    }
}

/// Outcome of one signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Rejected, with a message naming the offending file.
    Rejected(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// How strictly signature results are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Only a fully verified signature is acceptable.
    Strict,
    /// Tolerate unsigned and unverifiable packages; reject hard failures.
    Permissive,
}

impl TrustPolicy {
    /// Policy for a caller-supplied "allow untrusted" flag.
    pub fn from_allow_untrusted(allow_untrusted: bool) -> Self {
        if allow_untrusted {
            TrustPolicy::Permissive
        } else {
            TrustPolicy::Strict
        }
    }

    /// Classify a verification result for the file being processed.
    pub fn evaluate(self, result: VerifyResult, filename: &str) -> Verdict {
        match self {
            // Be less strict when untrusted transactions are allowed
            TrustPolicy::Permissive => match result {
                VerifyResult::Ok
                | VerifyResult::NoKey
                | VerifyResult::NotFound
                | VerifyResult::NotTrusted => Verdict::Accepted,
                VerifyResult::Fail => {
                    Verdict::Rejected(format!("signature does not verify for {}", filename))
                }
                VerifyResult::Unknown(_) => {
                    Verdict::Rejected(format!("failed to open (generic error): {}", filename))
                }
            },
            TrustPolicy::Strict => match result {
                VerifyResult::Ok => Verdict::Accepted,
                VerifyResult::NotTrusted => {
                    Verdict::Rejected(format!("failed to verify key for {}", filename))
                }
                VerifyResult::NoKey => {
                    Verdict::Rejected(format!("public key unavailable for {}", filename))
                }
                VerifyResult::NotFound => {
                    Verdict::Rejected(format!("signature not found for {}", filename))
                }
                VerifyResult::Fail => {
                    Verdict::Rejected(format!("signature does not verify for {}", filename))
                }
                VerifyResult::Unknown(_) => {
                    Verdict::Rejected(format!("failed to open (generic error): {}", filename))
                }
            },
        }
    }
}
