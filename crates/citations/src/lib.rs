//! # Discovery Citations
//!
//! Grounds `Source: path:start-end` citations in generated markdown against the files on disk.
//!
//! ```text
//! text ──> citation line ──> code fence within 3 lines ──> snippet identifiers (expected)
//!                 │
//!                 └──> cited range on disk ──> identifiers (found)
//!
//! |expected ∩ found| / |expected| >= threshold  ──>  <!-- CITATION_VERIFIED -->
//!                                    otherwise  ──>  <!-- CITATION_MISMATCH: ... -->
//!          missing file / range past EOF     ──>  <!-- CITATION_UNREADABLE: ... -->
//! ```

mod identifiers;
mod verifier;

pub use identifiers::extract_identifiers;
pub use verifier::{
    CitationCheck, CitationVerifier, VerificationReport, DEFAULT_OVERLAP_THRESHOLD, MARKER_PREFIX,
};
