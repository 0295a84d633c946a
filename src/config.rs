/// Bounds on how much work an iterator may do looking for the next instance.
///
/// Rules such as `FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30` are grammatical but
/// never match, so the generators need a point at which to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Number of consecutive years the year generator may advance through
    /// without an instance being emitted before the iterator is exhausted.
    pub max_years_between_instances: u32,
    /// No instance is generated past this year.
    pub max_year: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_years_between_instances: 1000,
            max_year: 9999,
        }
    }
}

impl Limits {
    pub fn with_max_years_between_instances(mut self, years: u32) -> Self {
        self.max_years_between_instances = years;
        self
    }

    pub fn with_max_year(mut self, year: i32) -> Self {
        self.max_year = year;
        self
    }
}
