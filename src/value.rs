/// Rating-to-price ranking metric: `(rating / price) * 10`.
pub fn value_score(rating: f64, price: f64) -> Option<f64> {
    if !rating.is_finite() || !price.is_finite() || price <= 0.0 {
        return None;
    }
    Some(rating / price * 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetOutcome {
    Won,
    Lost,
    /// Stake returned, e.g. the runner was scratched.
    Refunded,
}

#[derive(Debug, Clone, Copy)]
pub struct Bet {
    pub stake: f64,
    /// Decimal price taken.
    pub price: f64,
    pub outcome: BetOutcome,
}

impl Bet {
    pub fn profit(&self) -> f64 {
        match self.outcome {
            BetOutcome::Won => self.stake * (self.price - 1.0),
            BetOutcome::Lost => -self.stake,
            BetOutcome::Refunded => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlSummary {
    pub bets: usize,
    pub staked: f64,
    pub profit: f64,
    pub roi: f64,
    pub strike_rate: f64,
}

pub fn pnl_summary(bets: &[Bet]) -> PnlSummary {
    let mut settled = 0usize;
    let mut winners = 0usize;
    let mut staked = 0.0;
    let mut profit = 0.0;
    for bet in bets {
        if bet.outcome == BetOutcome::Refunded {
            continue;
        }
        settled += 1;
        staked += bet.stake;
        profit += bet.profit();
        if bet.outcome == BetOutcome::Won {
            winners += 1;
        }
    }

    let (roi, strike_rate) = if staked > 0.0 {
        (profit / staked, winners as f64 / settled as f64)
    } else {
        (0.0, 0.0)
    };

    PnlSummary {
        bets: bets.len(),
        staked,
        profit,
        roi,
        strike_rate,
    }
}
