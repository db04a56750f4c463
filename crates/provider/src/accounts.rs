//! Address lookups: account overview and SPL token holder lists.

use crate::methods::SolanaRpc;
use crate::wire::{AccountEncoding, KeyedAccount, ProgramAccountFilter};
use vantage_core::error::{VantageError, VantageResult};
use vantage_core::programs::{TOKEN_ACCOUNT_LEN, TOKEN_PROGRAM};
use vantage_core::{AccountOverview, TokenHolder};

#[derive(Clone)]
pub struct AccountService {
    rpc: SolanaRpc,
}

impl AccountService {
    pub fn new(rpc: SolanaRpc) -> Self {
        Self { rpc }
    }

    /// Balance, owner and the `limit` most recent signatures of `address`.
    /// An address with no account reads as zero lamports and no owner.
    pub async fn account_overview(&self, address: &str, limit: usize) -> VantageResult<AccountOverview> {
        if address.trim().is_empty() {
            return Err(VantageError::InvalidInput("empty address".into()));
        }
        let (lamports, info, recent_signatures) = tokio::try_join!(
            self.rpc.get_balance(address),
            self.rpc.get_account_info(address, AccountEncoding::Base64),
            self.rpc.get_signatures_for_address(address, limit),
        )?;

        Ok(AccountOverview {
            address: address.to_string(),
            lamports,
            owner: info.as_ref().map(|i| i.owner.clone()),
            executable: info.as_ref().is_some_and(|i| i.executable),
            data_len: info.as_ref().map_or(0, |i| i.data_len()),
            recent_signatures,
        })
    }

    /// Largest holders of `mint`, by raw amount, at most `limit` rows.
    pub async fn token_holders(&self, mint: &str, limit: usize) -> VantageResult<Vec<TokenHolder>> {
        if mint.trim().is_empty() {
            return Err(VantageError::InvalidInput("empty mint".into()));
        }
        let filters = [
            ProgramAccountFilter::DataSize(TOKEN_ACCOUNT_LEN),
            ProgramAccountFilter::Memcmp {
                offset: 0,
                bytes: mint.to_string(),
            },
        ];
        let accounts = self
            .rpc
            .get_program_accounts(TOKEN_PROGRAM, &filters, AccountEncoding::JsonParsed)
            .await?;

        let mut holders: Vec<(u128, TokenHolder)> =
            accounts.iter().filter_map(parse_token_account).collect();
        let skipped = accounts.len() - holders.len();
        if skipped > 0 {
            tracing::warn!(mint, skipped, "skipped unreadable token accounts");
        }

        holders.sort_by(|(a, _), (b, _)| b.cmp(a));
        Ok(holders.into_iter().take(limit).map(|(_, h)| h).collect())
    }
}

/// A `jsonParsed` SPL token account with its raw amount for sorting.
fn parse_token_account(account: &KeyedAccount) -> Option<(u128, TokenHolder)> {
    let parsed = account.account.parsed()?;
    let info = &parsed["info"];
    let token_amount = &info["tokenAmount"];
    let amount = token_amount["amount"].as_str()?;
    let raw = amount.parse::<u128>().ok()?;

    Some((
        raw,
        TokenHolder {
            token_account: account.pubkey.clone(),
            owner: info["owner"].as_str()?.to_string(),
            amount: amount.to_string(),
            ui_amount: token_amount["uiAmount"].as_f64(),
        },
    ))
}
