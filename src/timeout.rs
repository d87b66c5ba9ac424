use std::time::Duration;

/// Unit in which a [`Timeout`] value is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Micro,
    Nano,
}

/// A wait deadline: a value plus the precision it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeout {
    value: u64,
    precision: Precision,
}

impl Timeout {
    pub const fn new(value: u64, precision: Precision) -> Self {
        Self { value, precision }
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self::new(micros, Precision::Micro)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self::new(millis.saturating_mul(1_000), Precision::Micro)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn as_micros(&self) -> u64 {
        match self.precision {
            Precision::Micro => self.value,
            Precision::Nano => self.value / 1_000,
        }
    }

    /// Whole milliseconds, rounded down.
    pub fn as_millis(&self) -> u64 {
        self.as_micros() / 1_000
    }

    pub fn as_duration(&self) -> Duration {
        match self.precision {
            Precision::Micro => Duration::from_micros(self.value),
            Precision::Nano => Duration::from_nanos(self.value),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        match u64::try_from(duration.as_nanos()) {
            Ok(nanos) => Self::new(nanos, Precision::Nano),
            Err(_) => Self::new(
                u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
                Precision::Micro,
            ),
        }
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ms", self.as_millis())
    }
}
