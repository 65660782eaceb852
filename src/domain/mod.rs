//! Domain layer: money, pricing data, the price calculator, analytics
//! sessions, inquiries, and the authorization policy.
//!
//! Nothing in here performs I/O. The service layer wires these types to
//! the spreadsheet source, the snapshot store and the event buffer.

pub mod auth;
pub mod calculator;
pub mod clock;
pub mod configuration;
pub mod inquiry;
pub mod money;
pub mod pricing;
pub mod session;

pub use auth::{AuthPolicy, Caller, Credentials};
pub use calculator::{PriceBreakdown, PriceError, calculate_price};
pub use clock::{Clock, ManualClock, SystemClock};
pub use configuration::{Configuration, Selection};
pub use inquiry::{CustomerInquiry, InquiryId};
pub use money::Cents;
pub use pricing::{PricingData, PricingEntry, PricingSnapshot};
pub use session::{BufferedEvent, InteractionEvent, SessionStatus, UserSession};
