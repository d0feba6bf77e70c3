use crate::types::TokenEscrow;

pub(crate) fn assert_token_escrow(escrow: &TokenEscrow) {
    if escrow.total < 0 {
        panic!("Invariant violated: total must be non-negative");
    }
    if escrow.released < 0 {
        panic!("Invariant violated: released must be non-negative");
    }
    if escrow.escrowed < 0 {
        panic!("Invariant violated: escrowed must be non-negative");
    }
    if escrow.total != escrow.released + escrow.escrowed {
        panic!("Invariant violated: total must equal released plus escrowed");
    }
}

pub(crate) fn verify_token_escrow(escrow: &TokenEscrow) -> bool {
    escrow.total >= 0
        && escrow.released >= 0
        && escrow.escrowed >= 0
        && escrow.total == escrow.released + escrow.escrowed
}

pub(crate) fn assert_budget(percentage_total: u32) {
    if percentage_total > 100 {
        panic!("Invariant violated: milestone percentages exceed 100");
    }
}

pub(crate) fn verify_budget(percentage_total: u32) -> bool {
    percentage_total <= 100
}
