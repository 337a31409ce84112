//! Gap-tolerant time periods.
//!
//! Periods inside a collection are ordered and never overlap; neighbours
//! may share a boundary timestamp.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::data::{SectorContainment, TargetData};
use crate::utils::{format_time, seconds, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    InsideSector,
    OutsideSector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    begin: Timestamp,
    end: Timestamp,
    kind: PeriodKind,
    #[serde(skip)]
    updates: Vec<Timestamp>,
}

impl TimePeriod {
    pub fn new(begin: Timestamp, end: Timestamp) -> Self {
        Self::with_kind(begin, end, PeriodKind::InsideSector)
    }

    pub fn with_kind(begin: Timestamp, end: Timestamp, kind: PeriodKind) -> Self {
        assert!(end >= begin, "time period ends before it begins");
        Self { begin, end, kind, updates: Vec::new() }
    }

    pub fn begin(&self) -> Timestamp {
        self.begin
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn duration(&self) -> Duration {
        self.end - self.begin
    }

    /// Inclusive on both ends.
    pub fn is_inside(&self, t: Timestamp) -> bool {
        t >= self.begin && t <= self.end
    }

    /// `t` lies at or after the end and within `max_diff` of it. Earlier
    /// timestamps are never close.
    pub fn is_close_to_end(&self, t: Timestamp, max_diff: Duration) -> bool {
        t >= self.end && t - self.end <= max_diff
    }

    pub fn extend(&mut self, t: Timestamp) {
        assert!(t >= self.end, "period extended backwards");
        self.end = t;
    }

    pub fn add_update(&mut self, t: Timestamp) {
        self.updates.push(t);
    }

    pub fn updates(&self) -> &[Timestamp] {
        &self.updates
    }

    /// Number of whole update intervals fitting into the period.
    pub fn update_intervals(&self, update_interval: f64) -> u32 {
        if update_interval <= 0.0 {
            return 0;
        }
        (seconds(self.duration()) / update_interval).floor() as u32
    }
}

impl std::fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", format_time(&self.begin), format_time(&self.end))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimePeriodCollection {
    periods: Vec<TimePeriod>,
}

impl TimePeriodCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a period; it must not start before the last one ends.
    pub fn add(&mut self, period: TimePeriod) {
        if let Some(last) = self.periods.last() {
            assert!(last.end <= period.begin, "time periods out of order");
        }
        self.periods.push(period);
    }

    /// Extends the last period if `t` is within `tolerance` of its end,
    /// otherwise starts a new single-point period. A `t` already covered by
    /// the last period changes nothing; one before its begin is out of order
    /// and panics.
    pub fn extend_or_add(&mut self, t: Timestamp, tolerance: Duration) {
        match self.periods.last_mut() {
            Some(last) if last.is_inside(t) => {}
            Some(last) if last.is_close_to_end(t, tolerance) => last.extend(t),
            _ => self.add(TimePeriod::new(t, t)),
        }
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn clear(&mut self) {
        self.periods.clear();
    }

    pub fn period(&self, idx: usize) -> &TimePeriod {
        &self.periods[idx]
    }

    pub fn periods(&self) -> &[TimePeriod] {
        &self.periods
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimePeriod> {
        self.periods.iter()
    }

    pub fn is_inside(&self, t: Timestamp) -> bool {
        self.periods.iter().any(|p| p.is_inside(t))
    }

    /// Index of the period containing `t`. On a shared boundary an inside
    /// period wins over an outside one.
    pub fn period_index(&self, t: Timestamp) -> Option<usize> {
        let idx = self.periods.iter().position(|p| p.is_inside(t))?;
        let next_inside = self
            .periods
            .get(idx + 1)
            .filter(|n| n.kind == PeriodKind::InsideSector && n.begin == t);
        if self.periods[idx].kind == PeriodKind::OutsideSector && next_inside.is_some() {
            return Some(idx + 1);
        }
        Some(idx)
    }

    /// Assigns an update to its period; `false` if no period contains it.
    pub fn add_update(&mut self, t: Timestamp) -> bool {
        match self.period_index(t) {
            Some(idx) => {
                self.periods[idx].add_update(t);
                true
            }
            None => false,
        }
    }

    pub fn remove_small_periods(&mut self, min_duration: Duration) {
        self.periods.retain(|p| p.duration() >= min_duration);
    }

    /// Drops single-point periods, which cover no time.
    pub fn remove_point_periods(&mut self) {
        self.periods.retain(|p| p.end > p.begin);
    }

    /// Sum of whole update intervals over the inside periods.
    pub fn update_intervals(&self, update_interval: f64) -> u32 {
        self.periods
            .iter()
            .filter(|p| p.kind == PeriodKind::InsideSector)
            .map(|p| p.update_intervals(update_interval))
            .sum()
    }

    /// Covers `[tmin, tmax]` by inserting outside periods around and between
    /// the inside periods. Existing outside periods are dropped first.
    pub fn fill_in_outside_periods(&mut self, tmin: Option<Timestamp>, tmax: Option<Timestamp>) {
        let inside: Vec<TimePeriod> = self
            .periods
            .drain(..)
            .filter(|p| p.kind == PeriodKind::InsideSector)
            .map(|p| TimePeriod::new(p.begin, p.end))
            .collect();

        let (Some(first), Some(last)) = (inside.first(), inside.last()) else {
            if let (Some(t0), Some(t1)) = (tmin, tmax) {
                self.add(TimePeriod::with_kind(t0, t1, PeriodKind::OutsideSector));
            }
            return;
        };
        let (t0, t1) = (first.begin, last.end);

        if let Some(tmin) = tmin.filter(|&tmin| tmin < t0) {
            self.add(TimePeriod::with_kind(tmin, t0, PeriodKind::OutsideSector));
        }

        let mut prev_end: Option<Timestamp> = None;
        for p in inside {
            if let Some(end) = prev_end.filter(|&end| end < p.begin) {
                self.add(TimePeriod::with_kind(end, p.begin, PeriodKind::OutsideSector));
            }
            prev_end = Some(p.end);
            self.add(p);
        }

        if let Some(tmax) = tmax.filter(|&tmax| tmax > t1) {
            self.add(TimePeriod::with_kind(t1, tmax, PeriodKind::OutsideSector));
        }
    }

    /// Builds inside periods from the reference timestamps located inside
    /// the sector, extending while consecutive inside samples are within
    /// `max_ref_time_diff`.
    pub fn from_reference(
        target: &dyn TargetData,
        sector: &dyn SectorContainment,
        max_ref_time_diff: Duration,
        ground_bit_tolerance: Duration,
    ) -> Self {
        let mut periods = Self::new();
        let mut was_inside = false;

        for t in target.ref_timestamps() {
            let is_inside = !target.is_timestamp_excluded(t)
                && target.ref_pos(t).is_some_and(|pos| {
                    let gb = target.ref_ground_bit(t, ground_bit_tolerance);
                    sector.is_inside(&pos, gb.is_some(), gb.unwrap_or(false))
                });

            if is_inside {
                if was_inside {
                    periods.extend_or_add(t, max_ref_time_diff);
                } else {
                    periods.add(TimePeriod::new(t, t));
                }
            }
            was_inside = is_inside;
        }
        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::from_epoch_secs;

    fn ts(s: f64) -> Timestamp {
        from_epoch_secs(s)
    }

    fn bounds(c: &TimePeriodCollection) -> Vec<(Timestamp, Timestamp, PeriodKind)> {
        c.iter().map(|p| (p.begin(), p.end(), p.kind())).collect()
    }

    #[test]
    fn test_extend_within_tolerance() {
        let mut c = TimePeriodCollection::new();
        for s in [10.0, 16.0, 22.0] {
            c.extend_or_add(ts(s), Duration::seconds(6));
        }
        assert_eq!(c.len(), 1);
        assert_eq!((c.period(0).begin(), c.period(0).end()), (ts(10.0), ts(22.0)));

        // closeness is `t - end <= tolerance` against the current end: after
        // extending to 16, the gap 16 -> 24 exceeds a tolerance of 6
        let mut c = TimePeriodCollection::new();
        for s in [10.0, 16.0, 24.0] {
            c.extend_or_add(ts(s), Duration::seconds(6));
        }
        assert_eq!(c.len(), 2);

        let mut c = TimePeriodCollection::new();
        for s in [10.0, 16.0, 24.0] {
            c.extend_or_add(ts(s), Duration::seconds(8));
        }
        assert_eq!(c.len(), 1);
        assert_eq!((c.period(0).begin(), c.period(0).end()), (ts(10.0), ts(24.0)));
    }

    #[test]
    fn test_separate_points() {
        let mut c = TimePeriodCollection::new();
        c.extend_or_add(ts(10.0), Duration::seconds(6));
        c.extend_or_add(ts(40.0), Duration::seconds(6));
        assert_eq!(
            bounds(&c),
            vec![
                (ts(10.0), ts(10.0), PeriodKind::InsideSector),
                (ts(40.0), ts(40.0), PeriodKind::InsideSector)
            ]
        );
        assert!(c.is_inside(ts(10.0)));
        assert!(!c.is_inside(ts(20.0)));
    }

    #[test]
    fn test_timestamp_before_end() {
        let p = TimePeriod::new(ts(10.0), ts(20.0));
        assert!(!p.is_close_to_end(ts(15.0), Duration::seconds(6)));
        assert!(p.is_close_to_end(ts(20.0), Duration::seconds(6)));

        let mut c = TimePeriodCollection::new();
        c.add(p);
        c.extend_or_add(ts(15.0), Duration::seconds(6));
        assert_eq!(bounds(&c), vec![(ts(10.0), ts(20.0), PeriodKind::InsideSector)]);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_extend_before_begin_panics() {
        let mut c = TimePeriodCollection::new();
        c.add(TimePeriod::new(ts(10.0), ts(20.0)));
        c.extend_or_add(ts(5.0), Duration::seconds(6));
    }

    #[test]
    fn test_remove_point_periods() {
        let mut c = TimePeriodCollection::new();
        c.add(TimePeriod::new(ts(0.0), ts(0.0)));
        c.add(TimePeriod::new(ts(10.0), ts(12.0)));
        c.remove_point_periods();
        assert_eq!(bounds(&c), vec![(ts(10.0), ts(12.0), PeriodKind::InsideSector)]);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_add_out_of_order_panics() {
        let mut c = TimePeriodCollection::new();
        c.add(TimePeriod::new(ts(10.0), ts(20.0)));
        c.add(TimePeriod::new(ts(15.0), ts(30.0)));
    }

    #[test]
    fn test_fill_in_and_index() {
        let mut c = TimePeriodCollection::new();
        c.add(TimePeriod::new(ts(10.0), ts(20.0)));
        c.add(TimePeriod::new(ts(30.0), ts(40.0)));
        c.fill_in_outside_periods(Some(ts(0.0)), Some(ts(50.0)));

        assert_eq!(
            bounds(&c),
            vec![
                (ts(0.0), ts(10.0), PeriodKind::OutsideSector),
                (ts(10.0), ts(20.0), PeriodKind::InsideSector),
                (ts(20.0), ts(30.0), PeriodKind::OutsideSector),
                (ts(30.0), ts(40.0), PeriodKind::InsideSector),
                (ts(40.0), ts(50.0), PeriodKind::OutsideSector),
            ]
        );

        // shared boundaries prefer the inside period
        assert_eq!(c.period_index(ts(10.0)), Some(1));
        assert_eq!(c.period_index(ts(20.0)), Some(1));
        assert_eq!(c.period_index(ts(30.0)), Some(3));
        assert_eq!(c.period_index(ts(25.0)), Some(2));
        assert_eq!(c.period_index(ts(60.0)), None);

        assert!(c.add_update(ts(12.0)));
        assert_eq!(c.period(1).updates(), &[ts(12.0)]);
    }

    #[test]
    fn test_fill_in_without_inside() {
        let mut c = TimePeriodCollection::new();
        c.fill_in_outside_periods(Some(ts(0.0)), Some(ts(5.0)));
        assert_eq!(bounds(&c), vec![(ts(0.0), ts(5.0), PeriodKind::OutsideSector)]);
    }

    #[test]
    fn test_update_intervals_and_small_periods() {
        let mut c = TimePeriodCollection::new();
        c.add(TimePeriod::new(ts(0.0), ts(9.5)));
        c.add(TimePeriod::new(ts(20.0), ts(21.0)));
        c.add(TimePeriod::with_kind(ts(21.0), ts(100.0), PeriodKind::OutsideSector));

        assert_eq!(c.update_intervals(1.0), 9 + 1);

        c.remove_small_periods(Duration::seconds(2));
        assert_eq!(c.len(), 2);
        assert_eq!(c.update_intervals(1.0), 9);
    }
}
