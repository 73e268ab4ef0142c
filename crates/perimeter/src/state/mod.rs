pub mod perimeter;
pub mod settings;

pub use perimeter::{PerimeterModel, Segment, SubscriptionId};
pub use settings::{SettingsError, TraceSettings};
