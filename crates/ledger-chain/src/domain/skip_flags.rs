//! Checks a trusted caller may switch off, e.g. while replaying blocks the
//! node already validated.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SkipFlags: u32 {
        const SKIP_TRANSACTION_SIGNATURES = 1 << 0;
        const SKIP_TRANSACTION_DUPE_CHECK = 1 << 1;
        const SKIP_BLOCK_SIZE_CHECK = 1 << 2;
        const SKIP_TAPOS_CHECK = 1 << 3;
        const SKIP_AUTHORITY_CHECK = 1 << 4;
        const SKIP_MERKLE_CHECK = 1 << 5;
        const SKIP_ASSERT_EVALUATION = 1 << 6;
        const SKIP_VALIDATE = 1 << 7;
    }
}

impl SkipFlags {
    /// Everything a replay of locally validated blocks can skip.
    pub fn replay() -> Self {
        Self::SKIP_TRANSACTION_SIGNATURES
            | Self::SKIP_TRANSACTION_DUPE_CHECK
            | Self::SKIP_BLOCK_SIZE_CHECK
            | Self::SKIP_TAPOS_CHECK
            | Self::SKIP_AUTHORITY_CHECK
            | Self::SKIP_MERKLE_CHECK
            | Self::SKIP_VALIDATE
    }

    /// Authorities are only walked when signatures and authority checks
    /// both run.
    pub fn checks_authorities(self) -> bool {
        !self.intersects(Self::SKIP_TRANSACTION_SIGNATURES | Self::SKIP_AUTHORITY_CHECK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_keeps_assert_evaluation() {
        assert!(!SkipFlags::replay().contains(SkipFlags::SKIP_ASSERT_EVALUATION));
        assert!(!SkipFlags::replay().checks_authorities());
    }

    #[test]
    fn test_either_flag_disables_authorities() {
        assert!(SkipFlags::empty().checks_authorities());
        assert!(!SkipFlags::SKIP_AUTHORITY_CHECK.checks_authorities());
        assert!(!SkipFlags::SKIP_TRANSACTION_SIGNATURES.checks_authorities());
    }

    #[test]
    fn test_truncates_unknown_bits() {
        let flags = SkipFlags::from_bits_truncate(u32::MAX);
        assert_eq!(flags, SkipFlags::all());
    }
}
