//! Process-unique variable identities.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a variable, unique for the lifetime of the process.
///
/// Identities are drawn from a monotonic counter and never reused, so a
/// solver symbol can always be traced back to exactly one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u64);

impl VarId {
    /// Allocates a fresh identity.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Solver-visible symbol name (`v<id>`).
    pub fn symbol(self) -> String {
        format!("v{}", self.0)
    }

    /// Parses a symbol produced by [`VarId::symbol`].
    ///
    /// Auxiliary symbols such as `v7_bits` do not parse and yield `None`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let digits = symbol.strip_prefix('v')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
