//! Period boundary arithmetic.
//!
//! Periods are closed intervals `[open, close]` at tick (nanosecond)
//! granularity: `close = open + length - 1 tick`, so the next period opens
//! exactly one tick after the previous one closes.
//!
//! Fixed-length resolutions are anchored at 0001-01-01T00:00:00, which is a
//! Monday, so weekly periods always open on Mondays. Monthly periods open on
//! the first of the calendar month and are shifted with calendar month
//! arithmetic, never by a tick count.
//!
//! The trading variants skip periods with no trading time. A trading day is
//! any day except Saturday and Sunday; holidays are not modelled. A period
//! whose calendar open falls on a weekend but which still contains a weekday
//! (a month starting on a Saturday, say) is a trading period whose trading
//! open is the first weekday midnight inside it.
//!
//! Results that would fall outside the range `chrono` can represent saturate
//! at `NaiveDateTime::MIN` / `NaiveDateTime::MAX`.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::domain::resolution::{Resolution, TICKS_PER_DAY, TICKS_PER_SECOND};

const DAY: i128 = TICKS_PER_DAY as i128;
const SECOND: i128 = TICKS_PER_SECOND as i128;

/// The smallest representable gap between two instants.
pub fn tick() -> Duration {
    Duration::nanoseconds(1)
}

/// Ticks elapsed since 0001-01-01T00:00:00.
fn to_ticks(t: NaiveDateTime) -> i128 {
    let days = i128::from(t.date().num_days_from_ce()) - 1;
    // leap-second representations are folded into the preceding second
    let nanos = t.nanosecond().min(999_999_999);
    let time_of_day = i128::from(t.time().num_seconds_from_midnight()) * SECOND + i128::from(nanos);
    days * DAY + time_of_day
}

fn from_ticks(ticks: i128) -> Option<NaiveDateTime> {
    let days = i32::try_from(ticks.div_euclid(DAY) + 1).ok()?;
    let time_of_day = ticks.rem_euclid(DAY);
    let secs = u32::try_from(time_of_day / SECOND).ok()?;
    let nanos = u32::try_from(time_of_day % SECOND).ok()?;
    let date = NaiveDate::from_num_days_from_ce_opt(days)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)?;
    Some(date.and_time(time))
}

fn saturate(ticks: i128) -> NaiveDateTime {
    from_ticks(ticks).unwrap_or(if ticks < to_ticks(NaiveDateTime::MIN) {
        NaiveDateTime::MIN
    } else {
        NaiveDateTime::MAX
    })
}

fn month_open(t: NaiveDateTime) -> NaiveDateTime {
    let first = t.date().with_day(1).unwrap_or(t.date());
    first.and_time(NaiveTime::MIN)
}

fn shift_months(open: NaiveDateTime, n: i64) -> NaiveDateTime {
    let months = Months::new(u32::try_from(n.unsigned_abs()).unwrap_or(u32::MAX));
    if n >= 0 {
        open.checked_add_months(months).unwrap_or(NaiveDateTime::MAX)
    } else {
        open.checked_sub_months(months).unwrap_or(NaiveDateTime::MIN)
    }
}

/// Moves a period open by `n` whole periods.
fn shift(open: NaiveDateTime, n: i64, resolution: Resolution) -> NaiveDateTime {
    match resolution.ticks() {
        None => shift_months(open, n),
        Some(length) => saturate(to_ticks(open) + i128::from(n) * i128::from(length)),
    }
}

fn close_of(open: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    let next = shift(open, 1, resolution);
    if next == NaiveDateTime::MAX {
        return NaiveDateTime::MAX;
    }
    saturate(to_ticks(next) - 1)
}

/// Open of the period containing `t`.
pub fn current_period_open(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    match resolution.ticks() {
        None => month_open(t),
        Some(length) => {
            let ticks = to_ticks(t);
            saturate(ticks - ticks.rem_euclid(i128::from(length)))
        }
    }
}

/// Close of the period containing `t`.
pub fn current_period_close(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    close_of(current_period_open(t, resolution), resolution)
}

pub fn next_period_open(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    seek_periods(t, 1, resolution)
}

pub fn next_period_close(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    close_of(next_period_open(t, resolution), resolution)
}

pub fn previous_period_open(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    seek_periods(t, -1, resolution)
}

pub fn previous_period_close(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    close_of(previous_period_open(t, resolution), resolution)
}

/// Open of the period `n` periods away from the one containing `t`.
///
/// `t` is first re-anchored to its period open, so seeking `n` and then
/// `-n` lands on `current_period_open(t)`, not on `t` itself.
pub fn seek_periods(t: NaiveDateTime, n: i64, resolution: Resolution) -> NaiveDateTime {
    shift(current_period_open(t, resolution), n, resolution)
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn first_trading_instant(from: NaiveDateTime) -> Option<NaiveDateTime> {
    if is_trading_day(from.date()) {
        return Some(from);
    }
    let mut date = from.date();
    while !is_trading_day(date) {
        date = date.succ_opt()?;
    }
    Some(date.and_time(NaiveTime::MIN))
}

fn trading_open(open: NaiveDateTime, resolution: Resolution) -> Option<NaiveDateTime> {
    let first = first_trading_instant(open)?;
    (first <= close_of(open, resolution)).then_some(first)
}

/// Trading open of the period containing `t`, or `None` when that period
/// has no trading time at all.
pub fn current_trading_period_open(t: NaiveDateTime, resolution: Resolution) -> Option<NaiveDateTime> {
    trading_open(current_period_open(t, resolution), resolution)
}

pub fn is_in_trading_period(t: NaiveDateTime, resolution: Resolution) -> bool {
    current_trading_period_open(t, resolution).is_some_and(|open| t >= open)
}

fn step_trading(t: NaiveDateTime, step: i64, resolution: Resolution) -> NaiveDateTime {
    let mut open = current_period_open(t, resolution);
    loop {
        let candidate = shift(open, step, resolution);
        if candidate == open {
            return open;
        }
        if let Some(trading) = trading_open(candidate, resolution) {
            return trading;
        }
        open = candidate;
    }
}

pub fn next_trading_period_open(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    step_trading(t, 1, resolution)
}

pub fn next_trading_period_close(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    current_period_close(next_trading_period_open(t, resolution), resolution)
}

pub fn previous_trading_period_open(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    step_trading(t, -1, resolution)
}

pub fn previous_trading_period_close(t: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    current_period_close(previous_trading_period_open(t, resolution), resolution)
}

/// Trading open of the trading period `n` trading periods away from the one
/// containing `t`. With `n == 0` this is the current trading open, or the
/// next one when `t` sits in a period without trading time.
pub fn seek_trading_periods(t: NaiveDateTime, n: i64, resolution: Resolution) -> NaiveDateTime {
    if n == 0 {
        return current_trading_period_open(t, resolution)
            .unwrap_or_else(|| next_trading_period_open(t, resolution));
    }
    let step = n.signum();
    let mut anchor = t;
    for _ in 0..n.unsigned_abs() {
        anchor = step_trading(anchor, step, resolution);
    }
    anchor
}
