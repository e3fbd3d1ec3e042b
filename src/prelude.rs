pub use crate::config::{LoopConfig, MonitorConfig, SubscriberConfig};
pub use crate::error::{ReadError, SelectError, StoreError, StoreResult};
pub use crate::resp::Reply;
pub use crate::select::{Select, SelectOutcome, SelectResult, Selectable, Selected, ServiceClock};
pub use crate::store::{Connection, DbConfig, DbRegistry};
pub use crate::subscriber::{
    ChannelMessage, ChannelSubscriber, KeyspaceMessage, MultiChannelSubscriber, PatternSubscriber,
};
pub use crate::utils::logger::LoggerConfig;
pub use crate::utils::{ReadyFlag, StopToken};
