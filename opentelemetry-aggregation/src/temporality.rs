use std::time::SystemTime;

/// Defines the window that an aggregation was calculated over.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Temporality {
    /// A measurement interval that continues to expand forward in time from a
    /// starting point.
    ///
    /// New measurements are added to all previous measurements since a start time.
    #[default]
    Cumulative,

    /// A measurement interval that resets each cycle.
    ///
    /// Measurements from one cycle are recorded independently, measurements from
    /// other cycles do not affect them.
    Delta,
}

/// The time bounds of one collection cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CollectionWindow {
    /// When the instrument started reporting to the reader.
    pub start_time: SystemTime,
    /// The end of the previous cycle, or `start_time` for the first one.
    pub last_collection_time: SystemTime,
    /// The end of this cycle.
    pub collection_time: SystemTime,
}

impl CollectionWindow {
    /// The start of the interval a point of the given temporality covers.
    pub fn start_for(&self, temporality: Temporality) -> SystemTime {
        match temporality {
            Temporality::Cumulative => self.start_time,
            Temporality::Delta => self.last_collection_time,
        }
    }
}
