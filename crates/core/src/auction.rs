//! Auction countdown arithmetic and client-side bid checks.
//!
//! The countdown is a plain value that the storefront ticks once per second;
//! it never goes below zero. Bid checks are advisory: the backend remains the
//! judge of whether a bid wins.

use core::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::product::{Listing, Product};
use crate::types::Price;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Time remaining on an auction, split into display units.
///
/// Units are not normalized: a listing advertised as `"0d 30h"` keeps thirty
/// hours. Ticking borrows from the next-higher unit only when a unit is
/// already at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeLeft {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl TimeLeft {
    /// An expired auction.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    #[must_use]
    pub const fn new(days: u32, hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }

    /// Parse an advertised time-left string such as `"2d 14h"` or `"45m 10s"`.
    ///
    /// Tokens are whitespace separated and carry a `d`, `h`, `m` or `s`
    /// suffix. Anything unrecognized reads as zero, so this never fails.
    ///
    /// ```
    /// use marketplace_core::TimeLeft;
    ///
    /// assert_eq!(TimeLeft::parse("2d 14h"), TimeLeft::new(2, 14, 0, 0));
    /// assert_eq!(TimeLeft::parse("soon"), TimeLeft::ZERO);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut left = Self::ZERO;
        for token in s.split_whitespace() {
            let token = token.to_ascii_lowercase();
            let Some(unit) = token.chars().last() else {
                continue;
            };
            let Ok(value) = token.trim_end_matches(unit).parse::<u32>() else {
                continue;
            };
            match unit {
                'd' => left.days = value,
                'h' => left.hours = value,
                'm' => left.minutes = value,
                's' => left.seconds = value,
                _ => {}
            }
        }
        left
    }

    /// Split a whole number of seconds into days, hours, minutes and seconds.
    #[must_use]
    pub fn from_seconds(total: u64) -> Self {
        let days = u32::try_from(total / SECONDS_PER_DAY).unwrap_or(u32::MAX);
        let rest = total % SECONDS_PER_DAY;
        #[allow(clippy::cast_possible_truncation)] // each remainder is below 86400
        Self::new(
            days,
            (rest / SECONDS_PER_HOUR) as u32,
            (rest % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u32,
            (rest % SECONDS_PER_MINUTE) as u32,
        )
    }

    /// Time left until `end`, measured from `now`. Past end times read zero.
    #[must_use]
    pub fn until(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let delta: TimeDelta = end - now;
        u64::try_from(delta.num_seconds()).map_or(Self::ZERO, Self::from_seconds)
    }

    /// Total remaining seconds.
    #[must_use]
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.days) * SECONDS_PER_DAY
            + u64::from(self.hours) * SECONDS_PER_HOUR
            + u64::from(self.minutes) * SECONDS_PER_MINUTE
            + u64::from(self.seconds)
    }

    /// Whether every unit reads zero.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `false` when the countdown was already expired, in which case
    /// nothing changes.
    pub const fn tick(&mut self) -> bool {
        if self.seconds > 0 {
            self.seconds -= 1;
        } else if self.minutes > 0 {
            self.minutes -= 1;
            self.seconds = 59;
        } else if self.hours > 0 {
            self.hours -= 1;
            self.minutes = 59;
            self.seconds = 59;
        } else if self.days > 0 {
            self.days -= 1;
            self.hours = 23;
            self.minutes = 59;
            self.seconds = 59;
        } else {
            return false;
        }
        true
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_expired() {
            return f.write_str("Ended");
        }
        write!(
            f,
            "{}d {}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Reasons a bid is rejected before it leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    /// The listing is fixed-price.
    #[error("this item is not an auction")]
    NotAnAuction,

    /// The countdown has run out.
    #[error("this auction has ended")]
    AuctionEnded,

    /// The input is not a number.
    #[error("enter a valid amount (got {0:?})")]
    InvalidAmount(String),

    /// The amount does not beat the current price.
    #[error("bid must be at least {minimum}")]
    BelowMinimum {
        /// Lowest acceptable bid.
        minimum: Price,
    },
}

/// Bid entry state for one auction detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidForm {
    current: Price,
    ended: bool,
}

impl BidForm {
    /// Smallest step above the current price that counts as a higher bid.
    pub const MIN_INCREMENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

    /// Step above the current price pre-filled in the bid input.
    pub const SUGGESTED_STEP: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

    /// Open a bid form for `product` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::NotAnAuction`] for fixed-price listings.
    pub fn new(product: &Product, now: DateTime<Utc>) -> Result<Self, BidError> {
        let Listing::Auction(auction) = &product.listing else {
            return Err(BidError::NotAnAuction);
        };
        Ok(Self {
            current: product.current_price(),
            ended: auction.ends.time_left(now).is_some_and(|left| left.is_expired()),
        })
    }

    /// The price to beat.
    #[must_use]
    pub const fn current_price(&self) -> Price {
        self.current
    }

    /// Lowest acceptable bid: the current price plus one cent.
    #[must_use]
    pub fn minimum_bid(&self) -> Price {
        Price::new(self.current.amount() + Self::MIN_INCREMENT)
    }

    /// Amount pre-filled in the bid input.
    #[must_use]
    pub fn suggested_bid(&self) -> Price {
        Price::new(self.current.amount() + Self::SUGGESTED_STEP)
    }

    /// Mark the auction as ended, e.g. when the countdown expires.
    pub const fn close(&mut self) {
        self.ended = true;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.ended
    }

    /// Check raw user input against the advisory minimum.
    ///
    /// Accepts an optional leading `$` and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::AuctionEnded`] once closed,
    /// [`BidError::InvalidAmount`] for non-numeric input and
    /// [`BidError::BelowMinimum`] when the amount does not beat the current
    /// price.
    pub fn validate(&self, input: &str) -> Result<Price, BidError> {
        if self.ended {
            return Err(BidError::AuctionEnded);
        }
        let trimmed = input.trim();
        let amount: Decimal = trimmed
            .strip_prefix('$')
            .unwrap_or(trimmed)
            .trim()
            .parse()
            .map_err(|_| BidError::InvalidAmount(input.to_owned()))?;

        let minimum = self.minimum_bid();
        if amount < minimum.amount() {
            return Err(BidError::BelowMinimum { minimum });
        }
        Ok(Price::new(amount))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::product::{Auction, AuctionEnd};
    use crate::types::ProductId;

    fn auction(price_cents: i64, ends: AuctionEnd) -> Product {
        Product::new(
            ProductId::from(1_u64),
            "Jordan 4 Retro",
            Price::from_cents(price_cents),
            "SneakerHead_Pro",
            Listing::Auction(Auction {
                current_bid: None,
                bid_count: 12,
                ends,
            }),
        )
    }

    #[test]
    fn parse_reads_each_unit() {
        assert_eq!(TimeLeft::parse("2d 14h"), TimeLeft::new(2, 14, 0, 0));
        assert_eq!(TimeLeft::parse("1D 8H 5M 9S"), TimeLeft::new(1, 8, 5, 9));
        assert_eq!(TimeLeft::parse("45m"), TimeLeft::new(0, 0, 45, 0));
    }

    #[test]
    fn parse_treats_garbage_as_zero() {
        assert_eq!(TimeLeft::parse(""), TimeLeft::ZERO);
        assert_eq!(TimeLeft::parse("xd 3h"), TimeLeft::new(0, 3, 0, 0));
        assert_eq!(TimeLeft::parse("ends soon"), TimeLeft::ZERO);
    }

    #[test]
    fn tick_borrows_from_higher_units() {
        let mut left = TimeLeft::new(1, 0, 0, 0);
        assert!(left.tick());
        assert_eq!(left, TimeLeft::new(0, 23, 59, 59));

        let mut left = TimeLeft::new(0, 2, 0, 0);
        left.tick();
        assert_eq!(left, TimeLeft::new(0, 1, 59, 59));

        let mut left = TimeLeft::new(0, 0, 1, 0);
        left.tick();
        assert_eq!(left, TimeLeft::new(0, 0, 0, 59));
    }

    #[test]
    fn tick_clamps_at_zero() {
        let mut left = TimeLeft::new(0, 0, 0, 2);
        assert!(left.tick());
        assert!(left.tick());
        assert!(left.is_expired());
        assert!(!left.tick());
        assert_eq!(left, TimeLeft::ZERO);
    }

    #[test]
    fn ticking_to_expiry_takes_total_seconds() {
        let mut left = TimeLeft::new(0, 1, 1, 1);
        let mut ticks = 0;
        while left.tick() {
            ticks += 1;
        }
        assert_eq!(ticks, 3661);
        assert_eq!(left, TimeLeft::ZERO);
    }

    #[test]
    fn until_splits_duration_and_clamps_past() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = now + TimeDelta::seconds(2 * 86_400 + 14 * 3600 + 61);
        assert_eq!(TimeLeft::until(end, now), TimeLeft::new(2, 14, 1, 1));
        assert_eq!(TimeLeft::until(now - TimeDelta::hours(1), now), TimeLeft::ZERO);
    }

    #[test]
    fn display_formats_units() {
        assert_eq!(TimeLeft::new(2, 14, 3, 9).to_string(), "2d 14h 03m 09s");
        assert_eq!(TimeLeft::ZERO.to_string(), "Ended");
    }

    #[test]
    fn bid_form_minimum_and_suggestion() {
        let product = auction(29_999, AuctionEnd::Advertised(TimeLeft::new(2, 14, 0, 0)));
        let form = BidForm::new(&product, Utc::now()).unwrap();
        assert_eq!(form.minimum_bid(), Price::from_cents(30_000));
        assert_eq!(form.suggested_bid(), Price::from_cents(30_499));
    }

    #[test]
    fn bid_form_validates_input() {
        let product = auction(1000, AuctionEnd::Unknown);
        let form = BidForm::new(&product, Utc::now()).unwrap();

        assert_eq!(form.validate("$10.01"), Ok(Price::from_cents(1001)));
        assert_eq!(form.validate(" 15 "), Ok(Price::from_cents(1500)));
        assert_eq!(
            form.validate("10.00"),
            Err(BidError::BelowMinimum {
                minimum: Price::from_cents(1001)
            })
        );
        assert!(matches!(
            form.validate("ten dollars"),
            Err(BidError::InvalidAmount(_))
        ));
    }

    #[test]
    fn bid_form_rejects_fixed_price_and_ended_auctions() {
        let fixed = Product::new(
            ProductId::from(2_u64),
            "Jordan 5 Retro",
            Price::from_cents(18_999),
            "KickCollection",
            Listing::BuyItNow,
        );
        assert_eq!(BidForm::new(&fixed, Utc::now()), Err(BidError::NotAnAuction));

        let now = Utc::now();
        let ended = auction(1000, AuctionEnd::At(now - TimeDelta::minutes(5)));
        let form = BidForm::new(&ended, now).unwrap();
        assert!(!form.is_open());
        assert_eq!(form.validate("20"), Err(BidError::AuctionEnded));
    }
}
