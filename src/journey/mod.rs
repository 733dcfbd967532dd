//! Journey execution module
//!
//! One parameterized driver sequences search -> scan -> click -> dwell,
//! with pluggable result-page scan strategies per journey variant and the
//! CAPTCHA state machine re-entered at every network checkpoint.

mod driver;
mod log;
mod profile;
mod result;
mod scan;

pub use driver::{DriverConfig, DriverState, JourneyDriver};
pub use log::{ExecutionLog, StepRecord};
pub use profile::{JourneyProfile, JourneyVariant};
pub use result::{JourneyOutcome, JourneyRequest, JourneyResult};
pub use scan::{BroadScan, ImageScan, LocalPackScan, OrganicScan, ScanError, ScanStrategy};
