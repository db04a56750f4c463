//! Human-readable reports for the terminal.

use std::fmt::Write as _;
use std::time::Duration;
use vantage_core::{
    AccountOverview, CategoryCounts, ClassifiedBlock, EnrichedValidator, Snapshot, TokenHolder,
    WindowBucket,
};

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

const TOP: &str = "╔══════════════════════════════════════════════════════════════╗\n";
const MID: &str = "╠══════════════════════════════════════════════════════════════╣\n";
const BOTTOM: &str = "╚══════════════════════════════════════════════════════════════╝\n";

fn title(out: &mut String, text: &str) {
    out.push('\n');
    out.push_str(TOP);
    let _ = writeln!(out, "║{:^62}║", text);
    out.push_str(MID);
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "║  {:<20}{:>38} ║", label, value.to_string());
}

fn sol(lamports: u64) -> String {
    format!("{:.2} SOL", lamports as f64 / LAMPORTS_PER_SOL)
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

pub fn render_snapshot(s: &Snapshot) -> String {
    let mut out = String::new();
    title(&mut out, "NETWORK SNAPSHOT");
    row(&mut out, "Slot:", s.slot);
    row(&mut out, "Block height:", s.block_height);
    row(&mut out, "Epoch:", format!("{} ({:.1}%)", s.epoch, s.epoch_progress_pct));
    row(&mut out, "Slots remaining:", s.slots_remaining);
    row(&mut out, "Epoch ETA:", format_eta(s.eta_seconds));
    row(&mut out, "TPS:", s.tps_current);
    row(&mut out, "Transactions:", s.tx_count_total);
    row(&mut out, "Supply:", sol(s.supply_total));
    row(&mut out, "Circulating:", sol(s.supply_circulating));
    row(&mut out, "Validators:", format!("{} active / {} delinquent", s.validators_active, s.validators_delinquent));
    row(&mut out, "Active stake:", sol(s.stake_total));
    row(&mut out, "Node version:", &s.node_version);

    if !s.tps_history.is_empty() {
        out.push_str(MID);
        let peak = s.tps_history.iter().map(|p| p.tps).fold(0.0, f64::max);
        for point in &s.tps_history {
            let width = if peak > 0.0 { (point.tps / peak * 40.0).round() as usize } else { 0 };
            let _ = writeln!(out, "║  {:>6}s {:>8.0} {:<40}  ║", point.time, point.tps, "█".repeat(width));
        }
    }
    out.push_str(BOTTOM);
    out
}

fn format_eta(secs: u64) -> String {
    let (d, h, m) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    if d > 0 {
        format!("{d}d {h}h {m}m")
    } else {
        format!("{h}h {m}m")
    }
}

/// Recent-block breakdown with totals across the batch.
#[derive(Debug)]
pub struct BlockReport<'a> {
    pub blocks: &'a [ClassifiedBlock],
    pub totals: CategoryCounts,
    pub fetch_time: Duration,
}

impl<'a> BlockReport<'a> {
    pub fn build(blocks: &'a [ClassifiedBlock], fetch_time: Duration) -> Self {
        let mut totals = CategoryCounts::default();
        for b in blocks {
            totals.vote += b.vote_count;
            totals.transfer += b.transfer_count;
            totals.program += b.program_count;
            totals.other += b.other_count;
        }
        Self {
            blocks,
            totals,
            fetch_time,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let t = &self.totals;
        let total = t.total();

        title(&mut out, "RECENT BLOCKS");
        row(&mut out, "Blocks:", self.blocks.len());
        row(&mut out, "Transactions:", total);
        row(&mut out, "Vote:", format!("{} ({:.1}%)", t.vote, pct(t.vote, total)));
        row(&mut out, "Transfer:", format!("{} ({:.1}%)", t.transfer, pct(t.transfer, total)));
        row(&mut out, "Program:", format!("{} ({:.1}%)", t.program, pct(t.program, total)));
        row(&mut out, "Other:", format!("{} ({:.1}%)", t.other, pct(t.other, total)));
        row(&mut out, "Fetch time:", format!("{:?}", self.fetch_time));
        out.push_str(MID);

        if self.blocks.is_empty() {
            out.push_str("║  No blocks in range.                                         ║\n");
        } else {
            let _ = writeln!(out, "║  {:>11} {:>7} {:>7} {:>8} {:>8} {:>7}     ║", "SLOT", "TXS", "VOTE", "XFER", "PROG", "OTHER");
            for b in self.blocks {
                let _ = writeln!(
                    out,
                    "║  {:>11} {:>7} {:>7} {:>8} {:>8} {:>7}     ║",
                    b.slot, b.tx_count, b.vote_count, b.transfer_count, b.program_count, b.other_count
                );
            }
        }
        out.push_str(BOTTOM);
        out
    }
}

pub fn render_windows(buckets: &[WindowBucket]) -> String {
    let mut out = String::new();
    title(&mut out, "THROUGHPUT WINDOWS");
    let _ = writeln!(out, "║  {:>11} {:>5} {:>9} {:>8} {:>7} {:>6} {:>6}  ║", "END SLOT", "SECS", "TXS", "VOTE", "XFER", "PROG", "OTHER");
    for b in buckets {
        let _ = writeln!(
            out,
            "║  {:>11} {:>5} {:>9} {:>8} {:>7} {:>6} {:>6}  ║",
            b.end_slot, b.period_secs, b.tx_total, b.vote, b.transfer, b.program, b.other
        );
    }
    out.push_str(BOTTOM);
    out
}

pub fn render_validators(rows: &[EnrichedValidator]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<28} {:>16} {:>5} {:>7} {:<10} {}",
        "#", "NAME", "STAKE (SOL)", "COMM", "SKIP", "VERSION", "VOTE ACCOUNT"
    );
    for (i, v) in rows.iter().enumerate() {
        let skip = v
            .skip_rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "-".into());
        let name: String = v.identity.name.chars().take(28).collect();
        let _ = writeln!(
            out,
            "{:<4} {:<28} {:>16.0} {:>4}% {:>7} {:<10} {}{}",
            i + 1,
            name,
            v.activated_stake as f64 / LAMPORTS_PER_SOL,
            v.commission,
            skip,
            v.version.as_deref().unwrap_or("-"),
            v.vote_pubkey,
            if v.delinquent { "  [delinquent]" } else { "" }
        );
    }
    out
}

pub fn render_account(a: &AccountOverview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Address:    {}", a.address);
    let _ = writeln!(out, "Balance:    {} ({} lamports)", sol(a.lamports), a.lamports);
    let _ = writeln!(out, "Owner:      {}", a.owner.as_deref().unwrap_or("(no account)"));
    let _ = writeln!(out, "Executable: {}", a.executable);
    let _ = writeln!(out, "Data:       {} bytes", a.data_len);
    if !a.recent_signatures.is_empty() {
        let _ = writeln!(out, "\nRecent signatures:");
        for s in &a.recent_signatures {
            let status = if s.err.is_some() { "failed" } else { "ok" };
            let _ = writeln!(out, "  {:>11}  {:<6}  {}", s.slot, status, s.signature);
        }
    }
    out
}

pub fn render_holders(holders: &[TokenHolder]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<4} {:>24} {:<44} {}", "#", "AMOUNT", "OWNER", "TOKEN ACCOUNT");
    for (i, h) in holders.iter().enumerate() {
        let amount = h.ui_amount.map(|a| format!("{a:.4}")).unwrap_or_else(|| h.amount.clone());
        let _ = writeln!(out, "{:<4} {:>24} {:<44} {}", i + 1, amount, h.owner, h.token_account);
    }
    out
}
