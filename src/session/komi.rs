//! Komi auction: each seat bids a color and the komi it will concede for it.
//!
//! Resolution rules:
//! - different colors: each seat gets its color, komi stays at base;
//! - same color, different amounts: the higher bid gets the color; a Black
//!   winner adds its offer to base komi, a White winner subtracts it;
//! - same color, same amount: first time, bid again; second time, a coin
//!   flip picks the winner and the add/subtract rule applies.

use crate::core::{Bid, GameError, GameSession, KomiResolution, Phase, PlayerId, PlayerMap, RandomSource};
use crate::rules::Color;

/// Record a seat's bid. Bids are immutable once set within a round.
pub fn submit_bid(session: &mut GameSession, seat: PlayerId, bid: Bid) -> Result<(), GameError> {
    if session.phase != Phase::KomiBidding {
        return Err(GameError::WrongPhase {
            expected: Phase::KomiBidding,
            actual: session.phase,
        });
    }
    if bid.komi > session.config.max_komi_bid {
        return Err(GameError::InvalidAction(format!(
            "komi bid {} exceeds maximum {}",
            bid.komi, session.config.max_komi_bid
        )));
    }
    let slot = &mut session.auction.bids[seat];
    if slot.is_some() {
        return Err(GameError::AlreadySubmitted);
    }
    *slot = Some(bid);
    Ok(())
}

/// Bid an engine seat makes once the human has bid: the other color, free.
#[must_use]
pub fn ai_counter_bid(human: &Bid) -> Bid {
    Bid {
        color: human.color.opponent(),
        komi: 0,
    }
}

/// Have both seats bid this round?
#[must_use]
pub fn bids_complete(session: &GameSession) -> bool {
    session.auction.bids.all(Option::is_some)
}

/// Komi after the winner of a contested color pays for it.
#[must_use]
pub fn adjusted_komi(base: f64, winning_color: Color, offer: u32) -> f64 {
    match winning_color {
        Color::Black => base + f64::from(offer),
        Color::White => base - f64::from(offer),
    }
}

/// Settle an auction round.
pub fn resolve<R: RandomSource + ?Sized>(
    bids: &PlayerMap<Bid>,
    base_komi: f64,
    round: u8,
    rng: &mut R,
) -> KomiResolution {
    let first = bids[PlayerId::FIRST];
    let second = bids[PlayerId::SECOND];

    if first.color != second.color {
        return KomiResolution::Assigned {
            colors: PlayerMap::from_pair(first.color, second.color),
            final_komi: base_komi,
            coin_flip: false,
        };
    }

    let contested = first.color;
    let (winner, coin_flip) = if first.komi != second.komi {
        let w = if first.komi > second.komi {
            PlayerId::FIRST
        } else {
            PlayerId::SECOND
        };
        (w, false)
    } else if round < 2 {
        return KomiResolution::Rebid;
    } else {
        let w = if rng.coin_flip() {
            PlayerId::FIRST
        } else {
            PlayerId::SECOND
        };
        (w, true)
    };

    let mut colors = PlayerMap::with_value(contested.opponent());
    colors[winner] = contested;

    KomiResolution::Assigned {
        colors,
        final_komi: adjusted_komi(base_komi, contested, bids[winner].komi),
        coin_flip,
    }
}
