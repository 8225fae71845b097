use crate::{
    db::RangeOptions,
    util::{Result, Slice, Status},
};

/// Normalized range of a range iterator.
///
/// Built once from [`RangeOptions`] and never modified. It answers three
/// questions:
///
/// - where the first seek goes ([`RangeSpec::start`]),
/// - whether a key reached while stepping is still part of the range
///   ([`RangeSpec::admits`]),
/// - whether an explicit seek target lies outside the window entirely
///   ([`RangeSpec::out_of_range`]).
///
/// # Seek target precedence
///
/// ```text
/// reverse  && (lt | lte)  → seek to lt / lte
/// !reverse && (gt | gte)  → seek to gt / gte
/// otherwise               → seek to start (may be absent)
/// ```
///
/// `end` is the far boundary in the direction of travel: keys must be
/// `<= end` going forward and `>= end` going backward.
#[derive(Clone, Debug)]
pub struct RangeSpec {
    start: Option<Slice>,
    end: Option<Slice>,
    lt: Option<Slice>,
    lte: Option<Slice>,
    gt: Option<Slice>,
    gte: Option<Slice>,
    reverse: bool,
    limit: i64,
    keys: bool,
    values: bool,
}

/// Zero-length boundaries carry no information and are dropped.
fn non_empty(bound: &Option<Slice>) -> Option<Slice> {
    bound.as_ref().filter(|b| !b.is_empty()).cloned()
}

impl RangeSpec {
    pub fn new(options: &RangeOptions) -> Result<Self> {
        let lt = non_empty(&options.lt);
        let lte = non_empty(&options.lte);
        let gt = non_empty(&options.gt);
        let gte = non_empty(&options.gte);

        if lt.is_some() && lte.is_some() {
            return Err(Status::invalid_argument(
                "only one of lt and lte may be given",
            ));
        }
        if gt.is_some() && gte.is_some() {
            return Err(Status::invalid_argument(
                "only one of gt and gte may be given",
            ));
        }

        let reverse = options.reverse;
        let start = if reverse && (lt.is_some() || lte.is_some()) {
            lt.clone().or_else(|| lte.clone())
        } else if !reverse && (gt.is_some() || gte.is_some()) {
            gt.clone().or_else(|| gte.clone())
        } else {
            non_empty(&options.start)
        };

        Ok(RangeSpec {
            start,
            end: non_empty(&options.end),
            lt,
            lte,
            gt,
            gte,
            reverse,
            limit: options.limit,
            keys: options.keys,
            values: options.values,
        })
    }

    /// Effective initial seek target.
    pub fn start(&self) -> Option<&Slice> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Option<&Slice> {
        self.end.as_ref()
    }

    pub fn lt(&self) -> Option<&Slice> {
        self.lt.as_ref()
    }

    pub fn lte(&self) -> Option<&Slice> {
        self.lte.as_ref()
    }

    pub fn gt(&self) -> Option<&Slice> {
        self.gt.as_ref()
    }

    pub fn gte(&self) -> Option<&Slice> {
        self.gte.as_ref()
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn keys(&self) -> bool {
        self.keys
    }

    pub fn values(&self) -> bool {
        self.values
    }

    /// Per-entry inclusion test.
    ///
    /// `seen` is the running count of entries checked against `limit`; it
    /// is incremented on every call while a limit is set. Bounds are
    /// monotonic in the direction of travel, so the first `false` ends the
    /// iteration.
    pub fn admits(&self, key: &Slice, seen: &mut u64) -> bool {
        if self.limit >= 0 {
            *seen += 1;
            if *seen > self.limit as u64 {
                return false;
            }
        }
        self.contains(key)
    }

    /// Bound checks of [`RangeSpec::admits`] without the limit.
    pub fn contains(&self, key: &Slice) -> bool {
        let within_end = match &self.end {
            None => true,
            Some(end) if self.reverse => key >= end,
            Some(end) => key <= end,
        };

        let below_upper = match (&self.lt, &self.lte) {
            (Some(lt), _) => key < lt,
            (None, Some(lte)) => key <= lte,
            (None, None) => true,
        };

        let above_lower = match (&self.gt, &self.gte) {
            (Some(gt), _) => key > gt,
            (None, Some(gte)) => key >= gte,
            (None, None) => true,
        };

        within_end && below_upper && above_lower
    }

    /// Whether an explicit seek target lies outside the configured window.
    ///
    /// Unlike [`RangeSpec::contains`], `start` acts as a bound here: it caps
    /// the window from above in reverse and from below going forward.
    pub fn out_of_range(&self, target: &Slice) -> bool {
        let past_upper = match (&self.lt, &self.lte, &self.start) {
            (Some(lt), _, _) => target >= lt,
            (None, Some(lte), _) => target > lte,
            (None, None, Some(start)) if self.reverse => target > start,
            _ => false,
        };
        if past_upper {
            return true;
        }

        if let Some(end) = &self.end {
            let past_end = if self.reverse {
                target < end
            } else {
                target > end
            };
            if past_end {
                return true;
            }
        }

        match (&self.gt, &self.gte, &self.start) {
            (Some(gt), _, _) => target <= gt,
            (None, Some(gte), _) => target < gte,
            (None, None, Some(start)) if !self.reverse => target < start,
            _ => false,
        }
    }
}
