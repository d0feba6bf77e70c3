//! Percentage share and deduction math.
//!
//! ## Rounding Policy
//!
//! Every division floors. The milestone share is floored against the grant
//! total, the late penalty is floored against the share, and the site fee is
//! floored against what remains after the penalty. Flooring means the
//! contract never over-releases; the identity `penalty + fee + net == gross`
//! holds for every breakdown, and any dust from flooring the gross share
//! simply stays escrowed.

/// Whole-percent denominator.
pub const PERCENT: i128 = 100;

/// Full deduction breakdown for one token's milestone payout.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Breakdown {
    /// `total * percentage / 100`, floored. Moves from escrowed to released.
    pub gross: i128,
    /// Late-submission deduction, taken from gross.
    pub penalty: i128,
    /// Site fee, taken from gross after the penalty.
    pub fee: i128,
    /// What the grantee actually receives.
    pub net: i128,
}

/// `amount * percent / 100`, floored. `None` on overflow.
pub fn cut(amount: i128, percent: u32) -> Option<i128> {
    if percent == 0 {
        return Some(0);
    }
    amount
        .checked_mul(percent as i128)
        .map(|x| x / PERCENT)
}

/// Compute the payout breakdown for a milestone worth `percentage` of
/// `total`, with the given penalty and site-fee percentages.
///
/// `None` on arithmetic overflow; callers treat that as a hard error.
pub fn breakdown(
    total: i128,
    percentage: u32,
    penalty_percent: u32,
    fee_percent: u32,
) -> Option<Breakdown> {
    let gross = cut(total, percentage)?;
    let penalty = cut(gross, penalty_percent)?;
    let fee = cut(gross.checked_sub(penalty)?, fee_percent)?;
    let net = gross.checked_sub(penalty)?.checked_sub(fee)?;
    Some(Breakdown {
        gross,
        penalty,
        fee,
        net,
    })
}
