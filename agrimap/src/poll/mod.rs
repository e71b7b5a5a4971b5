//! Background result polling.
//!
//! After a drone report is uploaded the backend may take minutes to produce
//! its analysis. [`ResultPoller`] re-fetches the assessment on a fixed
//! interval until the analysis appears or the session times out, with
//! exactly one live session per assessment.
//!
//! # Example
//!
//! ```ignore
//! use agrimap::poll::{AssessmentClient, AssessmentRecord, PollerConfig, ResultPoller};
//!
//! let poller = ResultPoller::new(
//!     AssessmentClient::new(client, base_url, credentials),
//!     PollerConfig::default(),
//! );
//! let session = poller.start(
//!     "42",
//!     None,
//!     AssessmentRecord::has_analysis,
//!     |record| render(record.drone_analysis),
//!     |timeout| notify(timeout.message()),
//! );
//! ```

mod assessment;
mod config;
mod error;
mod poller;
mod session;
mod upload;

pub use assessment::{AssessmentClient, AssessmentRecord};
pub use config::{
    PollerConfig, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS, MIN_POLL_INTERVAL,
};
pub use error::{PollError, UploadError};
pub use poller::{ResourceFetcher, ResultPoller};
pub use session::{PollSession, PollState, PollTimeout, TIMEOUT_MESSAGE};
pub use upload::{DroneReportUploader, DroneReportWorkflow, Submission, UploadOutcome, REPORT_FIELD};
