//! Well-known program addresses.

/// Vote program. Every validator vote lands here.
pub const VOTE_PROGRAM: &str = "Vote111111111111111111111111111111111111111";

/// Native system program (lamport transfers, account creation).
pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";

/// Config program, home of validator-info records.
pub const CONFIG_PROGRAM: &str = "Config1111111111111111111111111111111111111";

/// Validator-info marker key inside config accounts.
pub const VALIDATOR_INFO_KEY: &str = "Va1idator1nfo111111111111111111111111111111";

/// SPL token program.
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Size of an SPL token account.
pub const TOKEN_ACCOUNT_LEN: u64 = 165;
